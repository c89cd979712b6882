//! Atomic replacement of the target directory.

use std::path::{Path, PathBuf};

use crate::error::FetchError;

/// Swap `source` into place under the name `target`.
///
/// An existing target is renamed aside to a timestamped backup before the
/// swap, so at no observable point is the name absent while older content
/// could still be served. On success the backup is deleted; on failure the
/// backup is renamed back and the orphaned source removed, leaving the
/// filesystem in its pre-call state. Only when that restore rename itself
/// fails is the run left needing manual intervention, reported as
/// [`FetchError::BackupRestoreFailed`] naming the surviving backup.
pub fn materialize(source: &Path, target: &Path) -> Result<(), FetchError> {
    let backup = if target.exists() {
        let backup = backup_path(target);
        std::fs::rename(target, &backup).map_err(|err| FetchError::MaterializationFailed {
            target: target.to_path_buf(),
            source: err,
        })?;
        Some(backup)
    } else {
        None
    };

    match std::fs::rename(source, target) {
        Ok(()) => {
            if let Some(backup) = backup {
                let _ = std::fs::remove_dir_all(backup);
            }
            Ok(())
        }
        Err(err) => {
            if let Some(backup) = &backup {
                if let Err(restore_err) = std::fs::rename(backup, target) {
                    return Err(FetchError::BackupRestoreFailed {
                        target: target.to_path_buf(),
                        backup: backup.clone(),
                        source: restore_err,
                    });
                }
            }
            let _ = std::fs::remove_dir_all(source);
            Err(FetchError::MaterializationFailed {
                target: target.to_path_buf(),
                source: err,
            })
        }
    }
}

fn backup_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(format!(".old.{}", chrono::Utc::now().timestamp()));
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_tree(dir: &Path, files: &[(&str, &str)]) {
        std::fs::create_dir_all(dir).unwrap();
        for (name, content) in files {
            std::fs::write(dir.join(name), content).unwrap();
        }
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn materialize_into_fresh_target() {
        let temp = tempfile::TempDir::new().unwrap();
        let source = temp.path().join("staging");
        let target = temp.path().join("lib");
        write_tree(&source, &[("a.rs", "fn a() {}")]);

        materialize(&source, &target).unwrap();

        assert_eq!(
            std::fs::read_to_string(target.join("a.rs")).unwrap(),
            "fn a() {}"
        );
        assert!(!source.exists());
    }

    #[test]
    fn materialize_replaces_existing_target() {
        let temp = tempfile::TempDir::new().unwrap();
        let source = temp.path().join("staging");
        let target = temp.path().join("lib");
        write_tree(&source, &[("new.rs", "new")]);
        write_tree(&target, &[("old.rs", "old")]);

        materialize(&source, &target).unwrap();

        assert!(target.join("new.rs").exists());
        assert!(!target.join("old.rs").exists());
        // No backup directory may survive a successful swap.
        assert_eq!(entries(temp.path()), vec!["lib".to_string()]);
    }

    #[test]
    fn failed_swap_restores_previous_target() {
        let temp = tempfile::TempDir::new().unwrap();
        let source = temp.path().join("staging-that-does-not-exist");
        let target = temp.path().join("lib");
        write_tree(&target, &[("old.rs", "old")]);

        let err = materialize(&source, &target).unwrap_err();
        assert!(matches!(err, FetchError::MaterializationFailed { .. }));

        // Pre-call state: the previous content is back, nothing else remains.
        assert_eq!(
            std::fs::read_to_string(target.join("old.rs")).unwrap(),
            "old"
        );
        assert_eq!(entries(temp.path()), vec!["lib".to_string()]);
    }

    #[test]
    fn failed_swap_without_previous_target_reports_failure() {
        let temp = tempfile::TempDir::new().unwrap();
        let source = temp.path().join("missing-staging");
        let target = temp.path().join("lib");

        let err = materialize(&source, &target).unwrap_err();
        assert!(matches!(err, FetchError::MaterializationFailed { .. }));
        assert!(!target.exists());
    }
}
