pub mod error;
pub mod hash;
pub mod html;
pub mod tree;

pub use error::*;
pub use hash::{Fingerprint, Fingerprints};
pub use tree::*;
