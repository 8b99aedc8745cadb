//! Page persistence.
//!
//! Each non-empty page is written as its own pretty-printed JSON artifact,
//! named from the coordinate and page index. Writes land in a `.tmp` sibling
//! first and are renamed into place, so an artifact that exists is complete.

use std::future::Future;
use std::path::{Path, PathBuf};

use listharvest_core::Coordinate;
use serde::Serialize;
use serde_json::Value;

use crate::error::ScraperError;
use crate::profile::format_degrees;

/// Destination for harvested pages.
pub trait PageSink {
    /// Creates whatever the sink needs before the first write. Idempotent.
    fn prepare(&self) -> impl Future<Output = Result<(), ScraperError>> + Send;

    /// Whether a complete artifact for this page already exists.
    fn has_page(&self, coordinate: Coordinate, page: u32) -> impl Future<Output = bool> + Send;

    /// Persists one page and returns where it went.
    fn write_page(
        &self,
        coordinate: Coordinate,
        page: u32,
        body: &Value,
    ) -> impl Future<Output = Result<PathBuf, ScraperError>> + Send;
}

/// Artifact file name for a page, e.g. `result_35.7_51.4_p0.json`.
#[must_use]
pub fn artifact_name(coordinate: Coordinate, page: u32) -> String {
    format!(
        "result_{}_{}_p{page}.json",
        format_degrees(coordinate.lat),
        format_degrees(coordinate.lng)
    )
}

/// Pretty-prints with four-space indentation. Non-ASCII text is written as-is.
fn render(body: &Value) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    body.serialize(&mut serializer)?;
    out.push(b'\n');
    Ok(out)
}

/// Writes artifacts into a single output directory.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn artifact_path(&self, coordinate: Coordinate, page: u32) -> PathBuf {
        self.dir.join(artifact_name(coordinate, page))
    }
}

impl PageSink for FileSink {
    async fn prepare(&self) -> Result<(), ScraperError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ScraperError::Persist {
                path: self.dir.display().to_string(),
                source: e,
            })
    }

    async fn has_page(&self, coordinate: Coordinate, page: u32) -> bool {
        tokio::fs::metadata(self.artifact_path(coordinate, page))
            .await
            .is_ok_and(|m| m.is_file())
    }

    async fn write_page(
        &self,
        coordinate: Coordinate,
        page: u32,
        body: &Value,
    ) -> Result<PathBuf, ScraperError> {
        let path = self.artifact_path(coordinate, page);
        let persist_err = |source: std::io::Error| ScraperError::Persist {
            path: path.display().to_string(),
            source,
        };

        let bytes = render(body).map_err(|e| persist_err(e.into()))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await.map_err(persist_err)?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(persist_err(e));
        }

        Ok(path)
    }
}
