//! Multiple record alignment around one growing seed.
//!
//! The seed is the prior template handed in by the caller or, failing that,
//! a copy of the largest record. Every other record is partially aligned
//! against it, largest first. A record that leaves unmatched siblings behind
//! without growing the seed waits in a retry queue; whenever the seed grows
//! the waiting records go back into the work queue.

use std::collections::{BTreeMap, HashMap};

use rd_core::{NodeId, Tree};
use rd_match::PartialTreeAligner;

use crate::record::Record;
use crate::seed::SeedTemplate;

/// Template node → document node correspondence of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMapping {
    pub record: Record,
    pub elements: HashMap<NodeId, NodeId>,
}

/// Result of [`RecordAligner::align`].
#[derive(Debug, Clone)]
pub struct AlignedRecords {
    pub template: SeedTemplate,
    /// The document record the template was copied from; `None` when a prior
    /// template was supplied.
    pub seed_record: Option<Record>,
    /// One entry per aligned record, in document order.
    pub mappings: Vec<RecordMapping>,
    /// Document node → template node, over all records.
    pub reverse: HashMap<NodeId, NodeId>,
    /// Template node count before the first alignment and after each one.
    pub seed_sizes: Vec<usize>,
}

struct Pending {
    position: usize,
    size: usize,
    record: Record,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordAligner {
    pta: PartialTreeAligner,
}

impl RecordAligner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Align `records` (elements of `tree`, in document order).
    ///
    /// Returns `None` when there is neither a record nor a prior template to
    /// build the seed from.
    pub fn align(
        &self,
        tree: &Tree,
        records: Vec<Record>,
        prior: Option<&SeedTemplate>,
    ) -> Option<AlignedRecords> {
        let mut work: Vec<Pending> = records
            .into_iter()
            .enumerate()
            .map(|(position, record)| Pending {
                position,
                size: record.size(tree),
                record,
            })
            .collect();

        let mut mappings: BTreeMap<usize, RecordMapping> = BTreeMap::new();
        let mut reverse: HashMap<NodeId, NodeId> = HashMap::new();

        let (mut template, seed_record) = match prior {
            Some(prior) => (prior.fork().0, None),
            None => {
                let seed = pop_largest(&mut work)?;
                let (template, provenance) = SeedTemplate::from_record(tree, &seed.record);
                reverse.extend(provenance.iter().map(|(t, d)| (*d, *t)));
                mappings.insert(
                    seed.position,
                    RecordMapping {
                        record: seed.record.clone(),
                        elements: provenance.into_iter().collect(),
                    },
                );
                (template, Some(seed.record))
            }
        };
        log::debug!(
            "seed has {} elements, {} nodes; {} records to align",
            template.len(),
            template.node_count(),
            work.len()
        );

        let mut seed_sizes = vec![template.node_count()];
        let mut retry: Vec<Pending> = Vec::new();

        while let Some(next) = pop_largest(&mut work) {
            let (seed_tree, seed_elements) = template.parts_mut();
            let result = self
                .pta
                .align_records(seed_tree, seed_elements, tree, next.record.elements());

            // A retried record replaces what its earlier attempt matched.
            if let Some(previous) = mappings.get(&next.position) {
                for doc in previous.elements.values() {
                    reverse.remove(doc);
                }
            }
            reverse.extend(result.mapping.iter().map(|(t, d)| (*d, *t)));
            mappings.insert(
                next.position,
                RecordMapping {
                    record: next.record.clone(),
                    elements: result.mapping,
                },
            );
            seed_sizes.push(template.node_count());

            if result.modified {
                log::trace!("record {} grew the seed to {} nodes", next.position, template.node_count());
                work.append(&mut retry);
            } else if result.had_unaligned_runs {
                log::trace!("record {} deferred, no unique insertion point", next.position);
                retry.push(next);
            }
        }

        if !retry.is_empty() {
            log::debug!("{} records kept a partial alignment", retry.len());
        }

        Some(AlignedRecords {
            template,
            seed_record,
            mappings: mappings.into_values().collect(),
            reverse,
            seed_sizes,
        })
    }
}

/// Remove the record with the largest size, the earliest one on ties.
fn pop_largest(queue: &mut Vec<Pending>) -> Option<Pending> {
    let (index, _) = queue.iter().enumerate().max_by(|(_, a), (_, b)| {
        a.size
            .cmp(&b.size)
            .then_with(|| b.position.cmp(&a.position))
    })?;
    Some(queue.remove(index))
}
