//! Streaming extraction of gzip-compressed tar archives.
//!
//! Entries are re-rooted by discarding a fixed number of leading path
//! segments, which both drops the archive's synthetic `repository-branch/`
//! wrapper directory and re-roots content at the requested subfolder
//! boundary. Entries with too few segments lie outside the requested
//! subtree and produce no filesystem output.

mod observe;

pub use observe::{NoopObserver, ObservedReader, ProgressObserver};

use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use tar::{Archive, Entry, EntryType};

use crate::error::FetchError;

/// Outcome of an extraction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Files and directories materialized under the destination root.
    pub entries_written: u64,
}

/// Stream a gzip tarball from `stream` and write its entries under `dest`,
/// discarding the first `strip_depth` path segments of every entry.
pub fn extract_archive<R: Read>(
    stream: R,
    strip_depth: usize,
    dest: &Path,
) -> Result<ExtractionReport, FetchError> {
    let mut archive = Archive::new(GzDecoder::new(stream));
    let mut entries_written = 0u64;

    let entries = archive.entries().map_err(FetchError::ArchiveCorrupt)?;
    for entry in entries {
        let mut entry = entry.map_err(FetchError::ArchiveCorrupt)?;
        let recorded = String::from_utf8_lossy(&entry.path_bytes()).into_owned();

        let segments: Vec<&str> = recorded.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() <= strip_depth {
            continue;
        }
        // Never let an archive entry escape the destination root.
        if segments.iter().any(|segment| *segment == "..") {
            tracing::debug!(path = %recorded, "skipping entry with unsafe path");
            continue;
        }

        let mut output = dest.to_path_buf();
        output.extend(&segments[strip_depth..]);

        match entry.header().entry_type() {
            EntryType::Directory => {
                std::fs::create_dir_all(&output).map_err(|err| FetchError::ExtractionIo {
                    path: output.clone(),
                    source: err,
                })?;
                entries_written += 1;
            }
            EntryType::Regular => {
                write_file(&mut entry, &output)?;
                entries_written += 1;
            }
            other => {
                tracing::debug!(path = %recorded, entry_type = ?other, "skipping unsupported entry type");
            }
        }
    }

    Ok(ExtractionReport { entries_written })
}

/// Write one regular-file entry, creating ancestors and preserving the
/// recorded permission mode where the platform supports it.
fn write_file<R: Read>(entry: &mut Entry<'_, R>, output: &Path) -> Result<(), FetchError> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent).map_err(|err| FetchError::ExtractionIo {
            path: parent.to_path_buf(),
            source: err,
        })?;
    }

    // Buffer the entry first so a truncated stream surfaces as a corrupt
    // archive rather than a half-written file blamed on the filesystem.
    let mut content = Vec::new();
    entry
        .read_to_end(&mut content)
        .map_err(FetchError::ArchiveCorrupt)?;

    std::fs::write(output, &content).map_err(|err| FetchError::ExtractionIo {
        path: output.to_path_buf(),
        source: err,
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(mode) = entry.header().mode() {
            let _ = std::fs::set_permissions(output, std::fs::Permissions::from_mode(mode));
        }
    }

    Ok(())
}

/// Count the files and directories below `root`, excluding the root itself.
pub fn count_tree_entries(root: &Path) -> u64 {
    fn walk(dir: &Path, count: &mut u64) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            *count += 1;
            let path = entry.path();
            if path.is_dir() {
                walk(&path, count);
            }
        }
    }

    let mut count = 0;
    walk(root, &mut count);
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a gzip tarball in memory from (path, kind) entries.
    enum Fixture<'a> {
        Dir(&'a str),
        File(&'a str, &'a [u8]),
        FileWithMode(&'a str, &'a [u8], u32),
        Symlink(&'a str, &'a str),
    }

    fn build_archive(entries: &[Fixture<'_>]) -> Vec<u8> {
        let encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for fixture in entries {
            match fixture {
                Fixture::Dir(path) => {
                    let mut header = tar::Header::new_gnu();
                    header.set_entry_type(EntryType::Directory);
                    header.set_size(0);
                    header.set_mode(0o755);
                    builder.append_data(&mut header, path, std::io::empty()).unwrap();
                }
                Fixture::File(path, content) => {
                    let mut header = tar::Header::new_gnu();
                    header.set_size(content.len() as u64);
                    header.set_mode(0o644);
                    builder.append_data(&mut header, path, *content).unwrap();
                }
                Fixture::FileWithMode(path, content, mode) => {
                    let mut header = tar::Header::new_gnu();
                    header.set_size(content.len() as u64);
                    header.set_mode(*mode);
                    builder.append_data(&mut header, path, *content).unwrap();
                }
                Fixture::Symlink(path, link_target) => {
                    let mut header = tar::Header::new_gnu();
                    header.set_entry_type(EntryType::Symlink);
                    header.set_size(0);
                    header.set_mode(0o777);
                    builder.append_link(&mut header, path, link_target).unwrap();
                }
            }
        }

        let encoder = builder.into_inner().unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn strips_wrapper_directory() {
        let archive = build_archive(&[
            Fixture::Dir("widgets-main/"),
            Fixture::File("widgets-main/README.md", b"hello"),
        ]);
        let temp = tempfile::TempDir::new().unwrap();

        let report = extract_archive(archive.as_slice(), 1, temp.path()).unwrap();

        assert_eq!(report.entries_written, 1);
        assert_eq!(
            std::fs::read_to_string(temp.path().join("README.md")).unwrap(),
            "hello"
        );
    }

    #[test]
    fn reroots_entries_at_subfolder_boundary() {
        // Wrapper + "src/lib" subfolder: strip depth 3.
        let archive = build_archive(&[
            Fixture::Dir("widgets-main/"),
            Fixture::Dir("widgets-main/src/"),
            Fixture::Dir("widgets-main/src/lib/"),
            Fixture::File("widgets-main/src/lib/a.rs", b"fn a() {}"),
            Fixture::File("widgets-main/src/lib/sub/b.rs", b"fn b() {}"),
            // Exactly strip-depth segments: outside the subfolder, no output.
            Fixture::File("widgets-main/src/other.rs", b"nope"),
            Fixture::File("widgets-main/README.md", b"nope"),
        ]);
        let temp = tempfile::TempDir::new().unwrap();

        let report = extract_archive(archive.as_slice(), 3, temp.path()).unwrap();

        assert_eq!(
            std::fs::read_to_string(temp.path().join("a.rs")).unwrap(),
            "fn a() {}"
        );
        assert_eq!(
            std::fs::read_to_string(temp.path().join("sub/b.rs")).unwrap(),
            "fn b() {}"
        );
        assert!(!temp.path().join("other.rs").exists());
        assert!(!temp.path().join("README.md").exists());
        // a.rs + sub/b.rs only; shallower entries produce nothing.
        assert_eq!(report.entries_written, 2);
    }

    #[test]
    fn creates_missing_ancestors_for_files() {
        // No directory entries at all; ancestors come from the file path.
        let archive = build_archive(&[Fixture::File("repo-main/deep/ly/nested.txt", b"x")]);
        let temp = tempfile::TempDir::new().unwrap();

        extract_archive(archive.as_slice(), 1, temp.path()).unwrap();

        assert!(temp.path().join("deep/ly/nested.txt").exists());
    }

    #[test]
    fn directory_entries_are_created_and_counted() {
        let archive = build_archive(&[
            Fixture::Dir("repo-main/"),
            Fixture::Dir("repo-main/docs/"),
            Fixture::Dir("repo-main/docs/img/"),
        ]);
        let temp = tempfile::TempDir::new().unwrap();

        let report = extract_archive(archive.as_slice(), 1, temp.path()).unwrap();

        assert!(temp.path().join("docs/img").is_dir());
        assert_eq!(report.entries_written, 2);
    }

    #[test]
    fn entries_at_or_below_strip_depth_produce_no_output() {
        let archive = build_archive(&[
            Fixture::Dir("repo-main/"),
            Fixture::File("repo-main/file.txt", b"x"),
        ]);
        let temp = tempfile::TempDir::new().unwrap();

        let report = extract_archive(archive.as_slice(), 2, temp.path()).unwrap();

        assert_eq!(report.entries_written, 0);
        assert_eq!(count_tree_entries(temp.path()), 0);
    }

    #[test]
    fn symlink_entries_are_skipped_without_error() {
        let archive = build_archive(&[
            Fixture::File("repo-main/real.txt", b"x"),
            Fixture::Symlink("repo-main/link.txt", "real.txt"),
        ]);
        let temp = tempfile::TempDir::new().unwrap();

        let report = extract_archive(archive.as_slice(), 1, temp.path()).unwrap();

        assert_eq!(report.entries_written, 1);
        assert!(!temp.path().join("link.txt").exists());
    }

    #[test]
    fn parent_traversal_entries_are_skipped() {
        // `tar::Header::set_path` refuses `..` components, so write the raw
        // name bytes the way a hostile archive would carry them.
        let path = b"repo-main/../escape.txt";
        let content = b"x";
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.as_old_mut().name[..path.len()].copy_from_slice(path);
        header.set_cksum();

        let encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.append(&header, &content[..]).unwrap();
        let archive = builder.into_inner().unwrap().finish().unwrap();

        let temp = tempfile::TempDir::new().unwrap();
        let dest = temp.path().join("dest");
        std::fs::create_dir(&dest).unwrap();

        let report = extract_archive(archive.as_slice(), 1, &dest).unwrap();

        assert_eq!(report.entries_written, 0);
        assert!(!temp.path().join("escape.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn preserves_recorded_permission_mode() {
        use std::os::unix::fs::PermissionsExt;

        let archive = build_archive(&[Fixture::FileWithMode(
            "repo-main/run.sh",
            b"#!/bin/sh\n",
            0o755,
        )]);
        let temp = tempfile::TempDir::new().unwrap();

        extract_archive(archive.as_slice(), 1, temp.path()).unwrap();

        let mode = std::fs::metadata(temp.path().join("run.sh"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn garbage_stream_reports_corrupt_archive() {
        let temp = tempfile::TempDir::new().unwrap();
        let result = extract_archive(&b"definitely not gzip"[..], 1, temp.path());
        assert!(matches!(result, Err(FetchError::ArchiveCorrupt(_))));
    }

    #[test]
    fn empty_archive_extracts_nothing() {
        let archive = build_archive(&[Fixture::Dir("repo-main/")]);
        let temp = tempfile::TempDir::new().unwrap();

        let report = extract_archive(archive.as_slice(), 1, temp.path()).unwrap();

        assert_eq!(report.entries_written, 0);
    }

    #[test]
    fn observer_sees_every_compressed_byte() {
        struct Counter(u64);
        impl ProgressObserver for Counter {
            fn on_bytes(&mut self, count: u64) {
                self.0 += count;
            }
        }

        let archive = build_archive(&[Fixture::File("repo-main/a.txt", b"content")]);
        let temp = tempfile::TempDir::new().unwrap();

        let mut counter = Counter(0);
        let reader = ObservedReader::new(archive.as_slice(), &mut counter);
        extract_archive(reader, 1, temp.path()).unwrap();

        assert_eq!(counter.0, archive.len() as u64);
    }

    #[test]
    fn count_tree_entries_excludes_root() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("a/b")).unwrap();
        std::fs::write(temp.path().join("a/f1.txt"), "x").unwrap();
        std::fs::write(temp.path().join("a/b/f2.txt"), "x").unwrap();

        // a, a/b, a/f1.txt, a/b/f2.txt
        assert_eq!(count_tree_entries(temp.path()), 4);
    }
}
