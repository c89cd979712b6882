//! Blob-filtered sparse checkout through the external `git` binary.

use std::path::Path;
use std::process::Command;

use crate::error::FetchError;
use crate::target::FetchTarget;

/// Minimum git version with cone-mode sparse-checkout support.
const MIN_GIT_VERSION: (u32, u32) = (2, 25);

/// Populate `stage` with the target's subfolder via a shallow, blob-filtered
/// sparse clone, then strip the version-control metadata.
///
/// On success `<stage>/<subfolder>` holds content equivalent to what archive
/// extraction would have produced for that subfolder. Each step's failure is
/// fatal; the caller discards the staging directory.
pub fn sparse_checkout(
    clone_url: &str,
    target: &FetchTarget,
    stage: &Path,
) -> Result<(), FetchError> {
    ensure_git_version()?;

    let stage_str = stage.to_str().ok_or_else(|| {
        FetchError::SparseCheckoutFailed(format!(
            "staging path is not valid UTF-8: {}",
            stage.display()
        ))
    })?;

    run_git(
        None,
        &[
            "clone",
            "-b",
            &target.branch,
            "--filter=blob:none",
            "--no-checkout",
            clone_url,
            stage_str,
        ],
    )?;
    run_git(Some(stage), &["sparse-checkout", "init", "--cone"])?;
    run_git(Some(stage), &["sparse-checkout", "set", &target.subfolder])?;
    run_git(Some(stage), &["checkout", &target.branch])?;

    let metadata = stage.join(".git");
    std::fs::remove_dir_all(&metadata).map_err(|err| {
        FetchError::SparseCheckoutFailed(format!(
            "failed to remove {}: {err}",
            metadata.display()
        ))
    })?;

    Ok(())
}

/// Ensure the installed git supports cone-mode sparse checkout (2.25+).
pub fn ensure_git_version() -> Result<(), FetchError> {
    let output = Command::new("git")
        .arg("--version")
        .output()
        .map_err(|err| {
            FetchError::SparseCheckoutFailed(format!("failed to invoke git --version: {err}"))
        })?;
    if !output.status.success() {
        return Err(FetchError::SparseCheckoutFailed(
            "git --version exited with a failure".to_string(),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let version = stdout
        .split_whitespace()
        .nth(2)
        .and_then(parse_version)
        .ok_or_else(|| {
            FetchError::SparseCheckoutFailed(format!(
                "unexpected git version output: {}",
                stdout.trim()
            ))
        })?;

    if version >= MIN_GIT_VERSION {
        Ok(())
    } else {
        Err(FetchError::SparseCheckoutFailed(format!(
            "git {}.{} is too old; 2.25+ is required for sparse checkout",
            version.0, version.1
        )))
    }
}

fn parse_version(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

/// Run a git command, treating a non-zero exit as a failed checkout step.
fn run_git(cwd: Option<&Path>, args: &[&str]) -> Result<(), FetchError> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let output = cmd.output().map_err(|err| {
        FetchError::SparseCheckoutFailed(format!("failed to run git {args:?}: {err}"))
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(FetchError::SparseCheckoutFailed(format!(
            "git {args:?}: {}",
            stderr.trim()
        )));
    }

    Ok(())
}
