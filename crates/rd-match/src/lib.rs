pub mod align;
pub mod lcs;
pub mod matcher;
pub mod partial;

pub use align::{Alignment, SimpleTreeAligner};
pub use matcher::{
    attribute_bonus, clustered_tree_match, simple_tree_match, subtree_size, ClusteredMatcher,
    MatchWeights,
};
pub use partial::{PartialAlignment, PartialTreeAligner};
