//! HTTP client for the GitHub archive endpoint.
//!
//! All requests are conditional: when a cached revision token exists it is
//! sent as `If-None-Match`, and a 304 answer short-circuits the fetch.

use std::io::Read;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_LENGTH, ETAG, IF_NONE_MATCH};

use crate::error::FetchError;
use crate::target::FetchTarget;

/// Host the archive and clone URLs are built against by default.
pub const DEFAULT_HOST: &str = "github.com";

/// Metadata learned from a `HEAD` request against the archive URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveProbe {
    /// Advertised archive size, when the host reports one.
    pub content_length: Option<u64>,
    /// `ETag` of the current archive revision, when the host reports one.
    pub revision_token: Option<String>,
}

/// Result of probing the archive endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The host confirmed the cached revision token is still current.
    NotModified,
    Available(ArchiveProbe),
}

/// An open download of the archive body.
pub struct ArchiveStream {
    /// Streaming response body; a gzip-compressed tarball.
    pub reader: Box<dyn Read>,
    pub content_length: Option<u64>,
    pub revision_token: Option<String>,
}

/// Result of a conditional `GET` against the archive URL.
pub enum ArchiveDownload {
    /// The host answered 304 between probe and download.
    NotModified,
    Stream(ArchiveStream),
}

/// Client for the remote archive endpoint.
pub struct RemoteClient {
    http: Client,
    host: String,
}

impl RemoteClient {
    /// Create a client for the given archive host (e.g. `github.com`).
    pub fn new(host: impl Into<String>) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(concat!("ghdir/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| {
                FetchError::RemoteUnavailable(format!("failed to build HTTP client: {err}"))
            })?;
        Ok(Self {
            http,
            host: host.into(),
        })
    }

    /// URL of the gzip tarball for the target's branch.
    pub fn archive_url(&self, target: &FetchTarget) -> String {
        format!(
            "https://{}/{}/{}/archive/refs/heads/{}.tar.gz",
            self.host, target.owner, target.repository, target.branch
        )
    }

    /// URL used by the sparse-checkout delegate to clone the repository.
    pub fn clone_url(&self, target: &FetchTarget) -> String {
        format!(
            "https://{}/{}/{}.git",
            self.host, target.owner, target.repository
        )
    }

    /// `HEAD` the archive URL to learn its size and revision token.
    pub fn probe(
        &self,
        target: &FetchTarget,
        cached_token: Option<&str>,
    ) -> Result<ProbeOutcome, FetchError> {
        let url = self.archive_url(target);
        let mut request = self.http.head(&url);
        if let Some(token) = cached_token {
            request = request.header(IF_NONE_MATCH, token);
        }

        let response = request
            .send()
            .map_err(|err| FetchError::RemoteUnavailable(format!("{url}: {err}")))?;

        match response.status() {
            StatusCode::NOT_MODIFIED => Ok(ProbeOutcome::NotModified),
            status if status.is_success() => Ok(ProbeOutcome::Available(ArchiveProbe {
                content_length: header_content_length(&response),
                revision_token: header_etag(&response),
            })),
            status => Err(FetchError::RemoteUnavailable(format!("{url}: HTTP {status}"))),
        }
    }

    /// `GET` the archive and hand back a streaming reader over the body.
    pub fn download(
        &self,
        target: &FetchTarget,
        cached_token: Option<&str>,
    ) -> Result<ArchiveDownload, FetchError> {
        let url = self.archive_url(target);
        let mut request = self.http.get(&url);
        if let Some(token) = cached_token {
            request = request.header(IF_NONE_MATCH, token);
        }

        let response = request
            .send()
            .map_err(|err| FetchError::RemoteUnavailable(format!("{url}: {err}")))?;

        match response.status() {
            StatusCode::NOT_MODIFIED => Ok(ArchiveDownload::NotModified),
            status if status.is_success() => {
                let content_length = header_content_length(&response);
                let revision_token = header_etag(&response);
                Ok(ArchiveDownload::Stream(ArchiveStream {
                    reader: Box::new(response),
                    content_length,
                    revision_token,
                }))
            }
            status => Err(FetchError::RemoteUnavailable(format!("{url}: HTTP {status}"))),
        }
    }
}

fn header_content_length(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn header_etag(response: &Response) -> Option<String> {
    Some(response.headers().get(ETAG)?.to_str().ok()?.to_string())
}
