pub mod aligner;
pub mod candidates;
pub mod cluster;
pub mod engine;
pub mod record;
pub mod result;
pub mod seed;

pub use aligner::{AlignedRecords, RecordAligner, RecordMapping};
pub use cluster::{hierarchical_cluster, linkage, Dendrogram, SimilarityMatrix};
pub use engine::{MinerConfig, RecordMiner};
pub use record::{Record, RecordFinder, SimilarityCache};
pub use result::*;
pub use seed::SeedTemplate;
