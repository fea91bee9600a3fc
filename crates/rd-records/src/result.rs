//! Extraction result types.
//!
//! [`Extraction`] is what [`crate::engine::RecordMiner::extract`] returns. It
//! refers to document nodes by id, so [`Extraction::summary`] resolves them
//! against the document into a self-contained [`ExtractionSummary`] that
//! serializes to JSON.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use rd_core::{NodeId, Result, Tree};

use crate::aligner::{AlignedRecords, RecordMapping};
use crate::record::Record;
use crate::seed::SeedTemplate;

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Learned template plus the per-record and reverse mappings.
///
/// When no repeated structure was found, `template` is `None` and both
/// mappings are empty.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub template: Option<SeedTemplate>,
    /// Document record the template was copied from, if any.
    pub seed_record: Option<Record>,
    /// Template node → document node, per record in document order. Does not
    /// include a prior template's own nodes.
    pub mappings: Vec<RecordMapping>,
    /// Document node → template node.
    pub reverse: HashMap<NodeId, NodeId>,
}

impl Extraction {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.template.is_none()
    }

    pub fn record_count(&self) -> usize {
        self.mappings.len()
    }

    /// Resolve the mappings against `tree`, the document they were extracted
    /// from.
    pub fn summary(&self, tree: &Tree) -> ExtractionSummary {
        let records = self
            .mappings
            .iter()
            .map(|mapping| RecordSummary::new(self, mapping, tree))
            .collect();

        ExtractionSummary {
            template_fingerprint: self.template.as_ref().map(SeedTemplate::fingerprint),
            template_elements: self.template.as_ref().map_or(0, SeedTemplate::len),
            template_nodes: self.template.as_ref().map_or(0, SeedTemplate::node_count),
            records,
        }
    }
}

impl From<AlignedRecords> for Extraction {
    fn from(aligned: AlignedRecords) -> Self {
        Self {
            template: Some(aligned.template),
            seed_record: aligned.seed_record,
            mappings: aligned.mappings,
            reverse: aligned.reverse,
        }
    }
}

// ---------------------------------------------------------------------------
// ExtractionSummary
// ---------------------------------------------------------------------------

/// JSON-friendly view of an [`Extraction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    /// See [`SeedTemplate::fingerprint`]; `None` when nothing was found.
    pub template_fingerprint: Option<String>,
    pub template_elements: usize,
    pub template_nodes: usize,
    pub records: Vec<RecordSummary>,
}

impl ExtractionSummary {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One record of the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSummary {
    /// Structural paths of the record's elements.
    pub elements: Vec<String>,
    /// The template was copied from this record.
    pub is_seed: bool,
    /// Matched nodes in document order.
    pub fields: Vec<FieldMatch>,
}

impl RecordSummary {
    fn new(extraction: &Extraction, mapping: &RecordMapping, tree: &Tree) -> Self {
        let template = extraction.template.as_ref();
        let mut pairs: Vec<(NodeId, NodeId)> = mapping
            .elements
            .iter()
            .map(|(seed, doc)| (*doc, *seed))
            .collect();
        pairs.sort_unstable();

        let fields = pairs
            .into_iter()
            .map(|(doc, seed)| FieldMatch {
                template_node: seed,
                template_tag: template
                    .map(|t| t.tree().tag(seed).to_string())
                    .unwrap_or_default(),
                path: tree.path(doc),
                text: tree.text(doc).map(str::to_string),
            })
            .collect();

        Self {
            elements: mapping.record.elements().iter().map(|e| tree.path(*e)).collect(),
            is_seed: extraction.seed_record.as_ref() == Some(&mapping.record),
            fields,
        }
    }
}

/// A document node matched to a template node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMatch {
    pub template_node: NodeId,
    pub template_tag: String,
    pub path: String,
    pub text: Option<String>,
}
