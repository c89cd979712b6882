//! Fetch orchestration: probe → strategy → retrieval → materialization.

use std::path::PathBuf;

use crate::cache::ChangeCache;
use crate::error::FetchError;
use crate::extract::{self, ObservedReader, ProgressObserver};
use crate::git;
use crate::materialize::materialize;
use crate::remote::{ArchiveDownload, ArchiveStream, RemoteClient};
use crate::stage::StagingArea;
use crate::strategy::{self, FetchPlan, Strategy};
use crate::target::FetchTarget;

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The cached revision token still matches; nothing was written.
    Unchanged,
    Completed {
        strategy: Strategy,
        /// Files and directories materialized.
        entries_written: u64,
        /// Where the fetched content ended up.
        output: PathBuf,
    },
}

/// Single-run fetch engine.
///
/// Holds the remote client, the change cache, and the working directory the
/// final target (and any staging directory) lives in. The cache is loaded by
/// the caller and saved here at most once, after a successful fetch.
pub struct FetchEngine {
    remote: RemoteClient,
    cache: ChangeCache,
    work_dir: PathBuf,
    force: bool,
}

impl FetchEngine {
    pub fn new(remote: RemoteClient, cache: ChangeCache, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            remote,
            cache,
            work_dir: work_dir.into(),
            force: false,
        }
    }

    /// Ignore the change cache: fetch even when the remote is unchanged.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Probe the remote and select a retrieval strategy.
    ///
    /// The caller inspects the plan before executing it: an `Unchanged` plan
    /// needs no further work, and a plan with `needs_confirmation` set must
    /// be confirmed interactively first.
    pub fn plan(&self, target: &FetchTarget) -> Result<FetchPlan, FetchError> {
        let probe = self.remote.probe(target, self.cached_token(target))?;
        Ok(strategy::select(target, &probe))
    }

    /// Execute a plan produced by [`plan`](Self::plan).
    pub fn execute(
        &mut self,
        target: &FetchTarget,
        plan: &FetchPlan,
        observer: &mut dyn ProgressObserver,
    ) -> Result<FetchOutcome, FetchError> {
        match plan.strategy {
            Strategy::Unchanged => Ok(FetchOutcome::Unchanged),
            Strategy::FullDownload => self.run_full_download(target, observer),
            Strategy::SparseCheckout => self.run_sparse_checkout(target, plan),
        }
    }

    fn run_full_download(
        &mut self,
        target: &FetchTarget,
        observer: &mut dyn ProgressObserver,
    ) -> Result<FetchOutcome, FetchError> {
        let download = self.remote.download(target, self.cached_token(target))?;
        let ArchiveStream {
            reader,
            revision_token,
            ..
        } = match download {
            // The remote may race a push between probe and download.
            ArchiveDownload::NotModified => return Ok(FetchOutcome::Unchanged),
            ArchiveDownload::Stream(stream) => stream,
        };
        let observed = ObservedReader::new(reader, observer);

        if target.subfolder.is_empty() {
            // Whole-repository fetch: extraction writes the final layout
            // directly and materialization is a no-op.
            let report = extract::extract_archive(observed, target.strip_depth(), &self.work_dir)?;
            self.record_token(target, revision_token.as_deref());
            return Ok(FetchOutcome::Completed {
                strategy: Strategy::FullDownload,
                entries_written: report.entries_written,
                output: self.work_dir.clone(),
            });
        }

        let stage = StagingArea::create_in(&self.work_dir)?;
        let report = match extract::extract_archive(observed, target.strip_depth(), stage.path()) {
            Ok(report) => report,
            Err(err) => {
                discard_stage(stage);
                return Err(err);
            }
        };

        let output = self.work_dir.join(target.output_name());
        // A successful swap renames the staging directory away; the later
        // drop of `stage` finds nothing to remove.
        if let Err(err) = materialize(stage.path(), &output) {
            discard_stage(stage);
            return Err(err);
        }

        self.record_token(target, revision_token.as_deref());
        Ok(FetchOutcome::Completed {
            strategy: Strategy::FullDownload,
            entries_written: report.entries_written,
            output,
        })
    }

    fn run_sparse_checkout(
        &mut self,
        target: &FetchTarget,
        plan: &FetchPlan,
    ) -> Result<FetchOutcome, FetchError> {
        debug_assert!(
            !target.subfolder.is_empty(),
            "sparse checkout is only selected for subfolder fetches"
        );

        let stage = StagingArea::create_in(&self.work_dir)?;
        if let Err(err) = git::sparse_checkout(
            &self.remote.clone_url(target),
            target,
            stage.path(),
        ) {
            discard_stage(stage);
            return Err(err);
        }

        let source: PathBuf = stage
            .path()
            .join(target.subfolder.split('/').collect::<PathBuf>());
        let output = self.work_dir.join(target.output_name());
        if let Err(err) = materialize(&source, &output) {
            discard_stage(stage);
            return Err(err);
        }

        // The checkout's now-empty parent skeleton is all that remains.
        discard_stage(stage);

        let entries_written = extract::count_tree_entries(&output);
        self.record_token(target, plan.revision_token.as_deref());
        Ok(FetchOutcome::Completed {
            strategy: Strategy::SparseCheckout,
            entries_written,
            output,
        })
    }

    fn cached_token(&self, target: &FetchTarget) -> Option<&str> {
        if self.force {
            None
        } else {
            self.cache.token(&target.cache_key())
        }
    }

    /// Record the new revision token and persist the cache (best-effort).
    fn record_token(&mut self, target: &FetchTarget, token: Option<&str>) {
        if let Some(token) = token {
            self.cache.set_token(target.cache_key(), token);
            self.cache.save();
        }
    }
}

/// Remove a staging directory, naming the leftover path if removal fails.
fn discard_stage(stage: StagingArea) {
    if let Err((path, err)) = stage.remove() {
        tracing::warn!(
            path = %path.display(),
            %err,
            "failed to remove staging directory; leftover content remains"
        );
    }
}
