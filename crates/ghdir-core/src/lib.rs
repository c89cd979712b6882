//! Ghdir Core Library
//!
//! Provides the domain logic for fetching a single subdirectory of a GitHub
//! repository: URL parsing, retrieval strategy selection, streaming archive
//! extraction, the change-detection cache, and atomic materialization of the
//! fetched directory.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod git;
pub mod materialize;
pub mod remote;
pub mod stage;
pub mod strategy;
pub mod target;

/// Re-exports of commonly used types
pub mod prelude {
    pub use crate::cache::ChangeCache;
    pub use crate::config::{ConfigStore, GhdirConfig};
    pub use crate::engine::{FetchEngine, FetchOutcome};
    pub use crate::error::FetchError;
    pub use crate::extract::{NoopObserver, ProgressObserver};
    pub use crate::remote::{ArchiveProbe, ProbeOutcome, RemoteClient};
    pub use crate::strategy::{FetchPlan, Strategy};
    pub use crate::target::FetchTarget;
}
