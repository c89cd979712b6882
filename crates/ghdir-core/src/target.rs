//! Source URL parsing for fetch targets.

use url::Url;

use crate::error::FetchError;

/// Branch used when the source URL encodes no explicit branch.
pub const DEFAULT_BRANCH: &str = "main";

/// A fully resolved fetch target.
///
/// Immutable once parsed. `owner` and `repository` are always non-empty;
/// `subfolder` is empty when the whole repository root was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub owner: String,
    pub repository: String,
    pub branch: String,
    /// Slash-separated path below the repository root, or empty.
    pub subfolder: String,
}

impl FetchTarget {
    /// Parse a GitHub URL into a fetch target.
    ///
    /// Supports formats:
    /// - `https://github.com/owner/repo`
    /// - `https://github.com/owner/repo/tree/branch`
    /// - `https://github.com/owner/repo/tree/branch/path/to/folder`
    pub fn parse(raw: &str) -> Result<Self, FetchError> {
        Self::parse_with_default_branch(raw, DEFAULT_BRANCH)
    }

    /// Parse a GitHub URL, falling back to `default_branch` when the URL
    /// carries no `tree/<branch>` segment.
    pub fn parse_with_default_branch(raw: &str, default_branch: &str) -> Result<Self, FetchError> {
        let parsed = Url::parse(raw).map_err(|_| FetchError::InvalidSourceUrl(raw.to_string()))?;

        let segments: Vec<&str> = parsed
            .path()
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        if segments.len() < 2 {
            return Err(FetchError::InvalidSourceUrl(raw.to_string()));
        }

        let owner = segments[0].to_string();
        let repository = segments[1].to_string();

        // The first `tree` segment with at least one following segment marks
        // the branch; everything after the branch is the subfolder.
        for (i, segment) in segments.iter().enumerate() {
            if *segment == "tree" && i + 1 < segments.len() {
                return Ok(Self {
                    owner,
                    repository,
                    branch: segments[i + 1].to_string(),
                    subfolder: segments[i + 2..].join("/"),
                });
            }
        }

        Ok(Self {
            owner,
            repository,
            branch: default_branch.to_string(),
            subfolder: String::new(),
        })
    }

    /// Key under which this target's revision token is cached.
    pub fn cache_key(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.owner, self.repository, self.branch, self.subfolder
        )
    }

    /// Number of leading path segments to discard from each archive entry.
    ///
    /// Archives wrap all content in a single `repository-branch/` directory,
    /// so the depth is 1 plus one segment per subfolder component.
    pub fn strip_depth(&self) -> usize {
        if self.subfolder.is_empty() {
            1
        } else {
            1 + self.subfolder.split('/').count()
        }
    }

    /// Name of the directory the fetched content ends up in: the last
    /// subfolder segment, or `.` when the repository root was requested.
    pub fn output_name(&self) -> &str {
        if self.subfolder.is_empty() {
            "."
        } else {
            self.subfolder
                .rsplit('/')
                .next()
                .expect("split of non-empty string yields at least one item")
        }
    }
}
