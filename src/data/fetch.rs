//! One-time dataset download with an on-disk cache.
//!
//! Files are cached under `HOUSING_CACHE_DIR` (default `data/`) using the last
//! path segment of the URL as the file name. A cached file is reused unless a
//! refresh is requested.

use std::fs;
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use tracing::info;
use url::Url;

use crate::domain::DatasetKind;
use crate::error::AppError;

const CACHE_DIR_ENV: &str = "HOUSING_CACHE_DIR";
const DEFAULT_CACHE_DIR: &str = "data";
const FALLBACK_FILE_NAME: &str = "download.csv";

/// Default house price index full file (HM Land Registry UK HPI).
pub const DEFAULT_HPI_URL: &str =
    "https://publicdata.landregistry.gov.uk/market-trend-data/house-price-index-data/UK-HPI-full-file-2023-06.csv";

/// Where a dataset comes from: a URL plus the directory its download is cached in.
#[derive(Debug, Clone)]
pub struct DatasetSource {
    pub kind: DatasetKind,
    pub url: Option<String>,
    pub cache_dir: PathBuf,
}

impl DatasetSource {
    /// Resolve the source from explicit values, falling back to the environment.
    ///
    /// `.env` is loaded once at startup (see `app::run`), so its values are visible here.
    pub fn resolve(kind: DatasetKind, url: Option<String>, cache_dir: Option<PathBuf>) -> Self {
        let url = url
            .or_else(|| std::env::var(kind.url_env()).ok())
            .filter(|u| !u.trim().is_empty())
            .or_else(|| match kind {
                DatasetKind::Hpi => Some(DEFAULT_HPI_URL.to_string()),
                DatasetKind::Ldd => None,
            });
        let cache_dir = cache_dir
            .or_else(|| std::env::var(CACHE_DIR_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));
        Self { kind, url, cache_dir }
    }

    pub fn url(&self) -> Result<&str, AppError> {
        self.url.as_deref().ok_or_else(|| {
            AppError::usage(format!(
                "No URL configured for the {} dataset. Pass `--url`, set {} or use `--input`.",
                self.kind.display_name(),
                self.kind.url_env()
            ))
        })
    }
}

/// Blocking downloader backed by a cache directory.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }

    /// Return the local path of the dataset, downloading it if needed.
    pub fn fetch(&self, source: &DatasetSource, refresh: bool) -> Result<PathBuf, AppError> {
        let url = source.url()?;
        let dest = cache_path(&source.cache_dir, url)?;

        if dest.exists() && !refresh {
            info!(path = %dest.display(), "using cached {}", source.kind.display_name());
            return Ok(dest);
        }

        fs::create_dir_all(&source.cache_dir).map_err(|e| {
            AppError::usage(format!(
                "Failed to create cache dir '{}': {e}",
                source.cache_dir.display()
            ))
        })?;

        info!(%url, "downloading {}", source.kind.display_name());
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| AppError::external(format!("Download request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::external(format!(
                "Download of {url} failed with status {}.",
                resp.status()
            )));
        }

        let bytes = resp
            .bytes()
            .map_err(|e| AppError::external(format!("Failed to read download body: {e}")))?;

        write_atomically(&dest, &bytes)?;
        info!(path = %dest.display(), bytes = bytes.len(), "download saved");
        Ok(dest)
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache file path for `url` under `cache_dir`.
pub fn cache_path(cache_dir: &Path, url: &str) -> Result<PathBuf, AppError> {
    let parsed = Url::parse(url).map_err(|e| AppError::usage(format!("Invalid URL '{url}': {e}")))?;
    let filename = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_FILE_NAME);
    Ok(cache_dir.join(filename))
}

// Write to a sibling `.part` file first so an interrupted download never
// leaves a truncated file that a later run would treat as cached.
fn write_atomically(dest: &Path, bytes: &[u8]) -> Result<(), AppError> {
    let mut part = dest.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    fs::write(&part, bytes)
        .map_err(|e| AppError::usage(format!("Failed to write '{}': {e}", part.display())))?;
    fs::rename(&part, dest)
        .map_err(|e| AppError::usage(format!("Failed to move download into '{}': {e}", dest.display())))?;
    Ok(())
}
