//! External git delegate for the sparse-checkout retrieval path.

mod sparse;

pub use sparse::{ensure_git_version, sparse_checkout};
