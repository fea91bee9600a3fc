//! The seed template: a private, growing copy of one record.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use rd_core::hash::sha256_hex;
use rd_core::{NodeId, RdError, Result, Tree};

use crate::record::Record;

/// Deep copy of a record's elements in an arena of its own.
///
/// Alignment inserts clones of unmatched candidate siblings into this tree;
/// nothing is ever removed. The document the record came from is never
/// touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedTemplate {
    tree: Tree,
    elements: Vec<NodeId>,
}

impl SeedTemplate {
    /// Copy `record` out of `source`.
    ///
    /// Returns the template together with the `(template node, source node)`
    /// pair of every copied node.
    pub fn from_record(source: &Tree, record: &Record) -> (Self, Vec<(NodeId, NodeId)>) {
        let mut tree = Tree::new();
        let mut elements = Vec::with_capacity(record.len());
        let mut provenance = Vec::new();
        for element in record.elements() {
            let (copy, pairs) = tree.import_subtree(source, *element);
            elements.push(copy);
            provenance.extend(pairs);
        }
        if let Some(first) = elements.first() {
            tree.set_root(*first);
        }
        (Self { tree, elements }, provenance)
    }

    /// Independent copy of this template, with the `(copy, original)` pairs.
    pub fn fork(&self) -> (Self, Vec<(NodeId, NodeId)>) {
        Self::from_record(&self.tree, &Record::new(self.elements.clone()))
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Template element roots, in record order.
    pub fn elements(&self) -> &[NodeId] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of nodes reachable from the template elements.
    pub fn node_count(&self) -> usize {
        self.elements.iter().map(|e| self.tree.subtree_size(*e)).sum()
    }

    /// Every template node, element by element in pre-order.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.elements
            .iter()
            .flat_map(|e| self.tree.descendants(*e))
            .collect()
    }

    /// First template node with the given tag.
    pub fn find(&self, tag: &str) -> Option<NodeId> {
        self.nodes().into_iter().find(|id| self.tree.tag(*id) == tag)
    }

    /// First template node whose attribute `name` equals `value`.
    pub fn find_by_attribute(&self, name: &str, value: &str) -> Option<NodeId> {
        self.nodes()
            .into_iter()
            .find(|id| self.tree.attribute(*id, name) == Some(value))
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut Tree, &[NodeId]) {
        (&mut self.tree, &self.elements)
    }

    /// Hex digest of the template's ordered structure (tags, `class` and
    /// `itemprop`). Two templates with the same digest have the same shape.
    pub fn fingerprint(&self) -> String {
        let mut out = String::new();
        for element in &self.elements {
            self.describe(*element, &mut out);
            out.push(';');
        }
        sha256_hex(out.as_bytes())
    }

    fn describe(&self, id: NodeId, out: &mut String) {
        out.push_str(self.tree.tag(id));
        for name in ["class", "itemprop"] {
            if let Some(value) = self.tree.attribute(id, name) {
                out.push_str(&format!("[{name}={value}]"));
            }
        }
        out.push('(');
        for child in self.tree.children(id) {
            self.describe(*child, out);
            out.push(',');
        }
        out.push(')');
    }

    // -----------------------------------------------------------------------
    // JSON
    // -----------------------------------------------------------------------

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Load a template stored with [`SeedTemplate::to_json`].
    pub fn from_json(json: &str) -> Result<Self> {
        let template: Self = serde_json::from_str(json)?;
        template.tree.validate()?;
        let mut seen = HashSet::new();
        for element in &template.elements {
            if element.index() >= template.tree.len() {
                return Err(RdError::InvalidInput(format!(
                    "template element {element} is outside a tree of {} nodes",
                    template.tree.len()
                )));
            }
            if template.tree.parent(*element).is_some() || !seen.insert(*element) {
                return Err(RdError::InvalidInput(format!(
                    "template element {element} is not a separate root"
                )));
            }
        }
        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rd_core::html::parse_fragment;

    fn two_items() -> (Tree, Record) {
        let tree = parse_fragment(
            r#"<ul><li class="item"><b>Ann</b><i>5</i></li><li class="item"><b>Bo</b></li></ul>"#,
        );
        let root = tree.root().expect("root");
        let record = Record::new(tree.children(root).to_vec());
        (tree, record)
    }

    #[test]
    fn copies_every_node_with_provenance() {
        let (source, record) = two_items();
        let (template, provenance) = SeedTemplate::from_record(&source, &record);
        assert_eq!(template.len(), 2);
        assert_eq!(template.node_count(), record.size(&source));
        assert_eq!(provenance.len(), template.node_count());
        for (copy, original) in provenance {
            assert_eq!(template.tree().tag(copy), source.tag(original));
            assert_eq!(template.tree().text(copy), source.text(original));
        }
    }

    #[test]
    fn fork_is_independent() {
        let (source, record) = two_items();
        let (template, _) = SeedTemplate::from_record(&source, &record);
        let (mut fork, pairs) = template.fork();
        assert_eq!(pairs.len(), template.node_count());

        let (tree, elements) = fork.parts_mut();
        let first = elements[0];
        let extra = tree.create_element("em");
        tree.append_child(first, extra);

        assert_eq!(fork.node_count(), template.node_count() + 1);
        assert_ne!(fork.fingerprint(), template.fingerprint());
    }

    #[test]
    fn fingerprint_follows_shape_not_text() {
        let a = parse_fragment("<li><b>one</b><i>1</i></li>");
        let b = parse_fragment("<li><b>two</b><i>2</i></li>");
        let c = parse_fragment("<li><i>2</i><b>two</b></li>");
        let seed = |t: &Tree| SeedTemplate::from_record(t, &Record::new(vec![t.root().expect("root")])).0;
        assert_eq!(seed(&a).fingerprint(), seed(&b).fingerprint());
        assert_ne!(seed(&a).fingerprint(), seed(&c).fingerprint());
    }

    #[test]
    fn lookups() {
        let (source, record) = two_items();
        let (template, _) = SeedTemplate::from_record(&source, &record);
        assert_eq!(template.find("i").map(|id| template.tree().tag(id)), Some("i"));
        assert!(template.find("table").is_none());
        let li = template.find_by_attribute("class", "item").expect("li");
        assert_eq!(li, template.elements()[0]);
    }

    #[test]
    fn json_round_trip() {
        let (source, record) = two_items();
        let (template, _) = SeedTemplate::from_record(&source, &record);
        let json = template.to_json().expect("serialize");
        let back = SeedTemplate::from_json(&json).expect("deserialize");
        assert_eq!(back.fingerprint(), template.fingerprint());
        assert_eq!(back.elements(), template.elements());
    }

    #[test]
    fn json_with_dangling_element_is_rejected() {
        let json = r#"{"tree":{"nodes":[],"root":null},"elements":[3]}"#;
        assert!(matches!(SeedTemplate::from_json(json), Err(RdError::InvalidInput(_))));
        assert!(matches!(SeedTemplate::from_json("{"), Err(RdError::Serialization(_))));
    }

    #[test]
    fn json_with_dangling_child_is_rejected() {
        let json = r#"{"tree":{"nodes":[
            {"tag":"li","attributes":{},"text":null,"parent":null,"children":[7]}
        ],"root":0},"elements":[0]}"#;
        let err = SeedTemplate::from_json(json).unwrap_err();
        assert!(matches!(err, RdError::InvalidInput(_)), "{err}");
    }

    #[test]
    fn json_with_cycle_is_rejected() {
        let json = r#"{"tree":{"nodes":[
            {"tag":"li","attributes":{},"text":null,"parent":null,"children":[]},
            {"tag":"b","attributes":{},"text":null,"parent":2,"children":[2]},
            {"tag":"i","attributes":{},"text":null,"parent":1,"children":[1]}
        ],"root":0},"elements":[0]}"#;
        assert!(matches!(SeedTemplate::from_json(json), Err(RdError::InvalidInput(_))));
    }

    #[test]
    fn json_with_nested_elements_is_rejected() {
        let (source, record) = two_items();
        let (template, _) = SeedTemplate::from_record(&source, &record);
        let first = template.elements()[0];
        let child = template.tree().children(first)[0];
        let mut value: serde_json::Value = serde_json::from_str(&template.to_json().expect("json")).expect("value");
        value["elements"] = serde_json::json!([first, child]);
        let err = SeedTemplate::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, RdError::InvalidInput(_)), "{err}");
    }
}
