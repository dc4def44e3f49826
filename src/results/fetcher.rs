use super::ResultFetcher;
use crate::config::{MAX_RESULT_ARCHIVE_BYTES, MAX_RESULT_MEMBER_BYTES};
use crate::error::{Error, Result};
use crate::execution::ResultLocation;
use async_trait::async_trait;
use reqwest::Client;
use std::io::{Cursor, Read, Seek};
use tracing::debug;
use zip::ZipArchive;

/// Downloads result archives through a content gateway and parses the
/// well-known JSON member.
pub struct HttpResultFetcher {
    gateway_url: String,
    member: String,
    max_archive_bytes: u64,
    max_member_bytes: u64,
    client: Client,
}

impl HttpResultFetcher {
    pub fn new(gateway_url: String, member: String) -> Self {
        Self {
            gateway_url,
            member,
            max_archive_bytes: MAX_RESULT_ARCHIVE_BYTES,
            max_member_bytes: MAX_RESULT_MEMBER_BYTES,
            client: Client::new(),
        }
    }

    /// Override the archive and member size caps.
    pub fn with_limits(mut self, max_archive_bytes: u64, max_member_bytes: u64) -> Self {
        self.max_archive_bytes = max_archive_bytes;
        self.max_member_bytes = max_member_bytes;
        self
    }

    /// Absolute URLs are used as-is; anything else is a path on the gateway.
    pub fn resolve_url(&self, location: &ResultLocation) -> String {
        let raw = location.as_str().trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else {
            format!(
                "{}/{}",
                self.gateway_url.trim_end_matches('/'),
                raw.trim_start_matches('/')
            )
        }
    }
}

#[async_trait]
impl ResultFetcher for HttpResultFetcher {
    async fn fetch(&self, location: &ResultLocation) -> Result<serde_json::Value> {
        let url = self.resolve_url(location);
        debug!("Fetching result archive from {}", url);

        let mut resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::ResultUnavailable(format!("GET {url}: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::ResultUnavailable(format!(
                "GET {url} returned {}",
                resp.status()
            )));
        }

        let too_large = || {
            Error::ResultMalformed(format!(
                "archive at {url} exceeds {} bytes",
                self.max_archive_bytes
            ))
        };
        if resp
            .content_length()
            .is_some_and(|len| len > self.max_archive_bytes)
        {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| Error::ResultUnavailable(format!("reading {url}: {e}")))?
        {
            if (body.len() + chunk.len()) as u64 > self.max_archive_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        extract_member(&body, &self.member, self.max_member_bytes)
    }
}

/// Open `archive` as a zip and parse the member named `member`, either at
/// the top level or inside a directory.
pub fn extract_json_member(archive: &[u8], member: &str) -> Result<serde_json::Value> {
    extract_member(archive, member, MAX_RESULT_MEMBER_BYTES)
}

fn extract_member(archive: &[u8], member: &str, max_bytes: u64) -> Result<serde_json::Value> {
    let mut zip = ZipArchive::new(Cursor::new(archive))
        .map_err(|e| Error::ResultMalformed(format!("not a zip archive: {e}")))?;

    let bytes = read_member_bytes(&mut zip, member, max_bytes)?
        .ok_or_else(|| Error::ResultMalformed(format!("archive has no '{member}' member")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| Error::ResultMalformed(format!("'{member}' is not valid JSON: {e}")))
}

/// `iexec_out/result.json` matches `result.json`; `computed-result.json` does not.
fn member_matches(name: &str, member: &str) -> bool {
    name == member
        || name
            .strip_suffix(member)
            .is_some_and(|dir| dir.ends_with('/'))
}

fn read_member_bytes<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    member: &str,
    max_bytes: u64,
) -> Result<Option<Vec<u8>>> {
    for idx in 0..archive.len() {
        let file = archive
            .by_index(idx)
            .map_err(|e| Error::ResultMalformed(format!("unreadable archive entry: {e}")))?;
        if file.is_dir() || !member_matches(file.name(), member) {
            continue;
        }

        let too_large =
            || Error::ResultMalformed(format!("'{member}' exceeds {max_bytes} bytes"));
        if file.size() > max_bytes {
            return Err(too_large());
        }
        // The declared size can lie; cap the read as well.
        let mut buf = Vec::new();
        file.take(max_bytes + 1)
            .read_to_end(&mut buf)
            .map_err(|e| Error::ResultMalformed(format!("reading '{member}': {e}")))?;
        if buf.len() as u64 > max_bytes {
            return Err(too_large());
        }
        return Ok(Some(buf));
    }
    Ok(None)
}
