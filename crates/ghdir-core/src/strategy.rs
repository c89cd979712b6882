//! Retrieval strategy selection.

use crate::remote::ProbeOutcome;
use crate::target::FetchTarget;

/// Archive size above which a requested subfolder is fetched through the
/// external sparse-checkout delegate instead of a full download.
pub const LARGE_ARCHIVE_THRESHOLD: u64 = 500 * 1024 * 1024;

/// Archive size above which the caller must obtain explicit confirmation
/// before any transfer starts.
pub const CONFIRM_THRESHOLD: u64 = 2 * 1024 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The cached revision token still matches; nothing to transfer.
    Unchanged,
    /// Stream the full archive and extract the requested subtree.
    FullDownload,
    /// Delegate to the external git binary for a blob-filtered sparse clone.
    SparseCheckout,
}

/// The selected strategy plus the probe data the execution step needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub strategy: Strategy,
    pub content_length: Option<u64>,
    pub revision_token: Option<String>,
    /// Set when the advertised size crosses [`CONFIRM_THRESHOLD`]; the caller
    /// must confirm interactively before executing the plan.
    pub needs_confirmation: bool,
}

/// Select a retrieval strategy for the target given the probe result.
pub fn select(target: &FetchTarget, probe: &ProbeOutcome) -> FetchPlan {
    let probe = match probe {
        ProbeOutcome::NotModified => {
            return FetchPlan {
                strategy: Strategy::Unchanged,
                content_length: None,
                revision_token: None,
                needs_confirmation: false,
            };
        }
        ProbeOutcome::Available(probe) => probe,
    };

    let length = probe.content_length;
    let strategy = match length {
        Some(length) if !target.subfolder.is_empty() && length > LARGE_ARCHIVE_THRESHOLD => {
            Strategy::SparseCheckout
        }
        _ => Strategy::FullDownload,
    };

    FetchPlan {
        strategy,
        content_length: length,
        revision_token: probe.revision_token.clone(),
        needs_confirmation: length.is_some_and(|length| length > CONFIRM_THRESHOLD),
    }
}
