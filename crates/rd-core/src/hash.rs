use sha2::{Digest, Sha256};

use crate::tree::{NodeId, Tree};

/// SHA-256 digest of a subtree's canonical structure.
pub type Fingerprint = [u8; 32];

/// Lowercase hex SHA-256 digest of `input`.
pub fn sha256_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    format!("{:x}", hasher.finalize())
}

/// Structural fingerprints for every node of a tree.
///
/// The fingerprint of a node is computed from its tag, its `class` and
/// `itemprop` attributes and the *sorted* fingerprints of its children, so
/// two subtrees that differ only in the order of their children share a
/// fingerprint. Text content does not take part.
#[derive(Debug, Clone)]
pub struct Fingerprints {
    digests: Vec<Fingerprint>,
}

impl Fingerprints {
    pub fn compute(tree: &Tree) -> Self {
        let mut digests = vec![[0u8; 32]; tree.len()];
        let mut done = vec![false; tree.len()];
        for raw in 0..tree.len() {
            let id = NodeId::new(raw as u32);
            if tree.parent(id).is_none() {
                fill(tree, id, &mut digests, &mut done);
            }
        }
        Self { digests }
    }

    pub fn get(&self, id: NodeId) -> &Fingerprint {
        &self.digests[id.index()]
    }

    pub fn hex(&self, id: NodeId) -> String {
        self.get(id).iter().map(|b| format!("{b:02x}")).collect()
    }
}

fn fill(tree: &Tree, id: NodeId, digests: &mut [Fingerprint], done: &mut [bool]) {
    let mut children: Vec<Fingerprint> = Vec::with_capacity(tree.children(id).len());
    for child in tree.children(id) {
        if !done[child.index()] {
            fill(tree, *child, digests, done);
        }
        children.push(digests[child.index()]);
    }
    children.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(tree.tag(id).as_bytes());
    hasher.update([0]);
    hasher.update(tree.attribute(id, "class").unwrap_or_default().as_bytes());
    hasher.update([0]);
    hasher.update(tree.attribute(id, "itemprop").unwrap_or_default().as_bytes());
    hasher.update([0]);
    for child in &children {
        hasher.update(child);
    }
    digests[id.index()] = hasher.finalize().into();
    done[id.index()] = true;
}
