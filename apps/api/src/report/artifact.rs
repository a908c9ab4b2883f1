//! Output artifacts: naming, serialization, fingerprinting and atomic persistence.
//!
//! Persisting writes each file to a temp file in the target directory and renames it
//! into place, so a reader never observes a partially-written artifact.

use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::info;

use crate::report::assembler::Document;
use crate::report::render_html::render_html;

pub const ARTIFACT_PREFIX: &str = "Diagnostico";

/// Per-part cap on the stem, in bytes. Keeps file names under the 255-byte limit
/// common to Linux, macOS and Windows file systems.
const STEM_PART_MAX_BYTES: usize = 80;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("persist task failed: {0}")]
    Task(String),
}

/// A rendered, not yet persisted, report.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Stem without extension, e.g. `Diagnostico_Acme_Foods_2024`.
    pub stem: String,
    pub html: Bytes,
    pub json: Bytes,
    /// Lowercase hex SHA-256 of the document's JSON.
    pub fingerprint: String,
}

impl Artifact {
    pub fn html_file_name(&self) -> String {
        format!("{}.html", self.stem)
    }

    pub fn json_file_name(&self) -> String {
        format!("{}.json", self.stem)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedArtifact {
    pub html_path: PathBuf,
    pub json_path: PathBuf,
}

/// `Diagnostico_<Company>_<Period>`, whitespace runs replaced with `_`.
/// Path separators and other characters invalid in file names are dropped and each
/// part is capped at `STEM_PART_MAX_BYTES`.
pub fn artifact_stem(company: &str, period: &str) -> String {
    let mut stem = String::from(ARTIFACT_PREFIX);
    for part in [company, period] {
        let cleaned = clean_part(part);
        if !cleaned.is_empty() {
            stem.push('_');
            stem.push_str(&cleaned);
        }
    }
    stem
}

fn clean_part(part: &str) -> String {
    let mut cleaned = part
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
                .filter(|c| !c.is_control())
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    if cleaned.len() > STEM_PART_MAX_BYTES {
        let cut = (0..=STEM_PART_MAX_BYTES)
            .rev()
            .find(|&i| cleaned.is_char_boundary(i))
            .unwrap_or(0);
        cleaned.truncate(cut);
        cleaned.truncate(cleaned.trim_end_matches('_').len());
    }
    cleaned
}

/// SHA-256 over the compact JSON serialization of the document. Field order is fixed
/// by the struct definitions and no maps are involved, so the bytes are canonical.
pub fn fingerprint(document: &Document) -> Result<String, ArtifactError> {
    let bytes = serde_json::to_vec(document)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Renders HTML and JSON for `document`.
pub fn build_artifact(document: &Document) -> Result<Artifact, ArtifactError> {
    let meta = document.metadata();
    Ok(Artifact {
        stem: artifact_stem(&meta.company, &meta.period),
        html: Bytes::from(render_html(document)),
        json: Bytes::from(serde_json::to_vec_pretty(document)?),
        fingerprint: fingerprint(document)?,
    })
}

/// Writes both files into `dir` (created if missing). Runs on the blocking pool.
pub async fn persist_artifact(artifact: &Artifact, dir: &Path) -> Result<PersistedArtifact, ArtifactError> {
    let dir = dir.to_path_buf();
    let html_path = dir.join(artifact.html_file_name());
    let json_path = dir.join(artifact.json_file_name());
    let html = artifact.html.clone();
    let json = artifact.json.clone();

    let persisted = tokio::task::spawn_blocking(move || -> Result<PersistedArtifact, ArtifactError> {
        std::fs::create_dir_all(&dir)?;
        write_atomic(&dir, &html_path, &html)?;
        write_atomic(&dir, &json_path, &json)?;
        Ok(PersistedArtifact {
            html_path,
            json_path,
        })
    })
    .await
    .map_err(|e| ArtifactError::Task(e.to_string()))??;

    info!(
        html = %persisted.html_path.display(),
        fingerprint = %artifact.fingerprint,
        "Artifact persisted"
    );
    Ok(persisted)
}

fn write_atomic(dir: &Path, target: &Path, contents: &[u8]) -> Result<(), ArtifactError> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| ArtifactError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::layout::budget::default_layout_config;
    use crate::layout::paginator::{Page, PageSegment, SectionHeading};
    use crate::layout::raster::RasterStats;
    use crate::report::assembler::{assemble, DocumentMetadata};

    fn document(company: &str) -> Document {
        let page = Page {
            number: 1,
            segments: vec![PageSegment {
                section_key: "cover".to_string(),
                heading: SectionHeading {
                    title: "Cover".to_string(),
                    continuation: false,
                    part: None,
                },
                blocks: vec![],
            }],
            usage: Default::default(),
            budget: default_layout_config().page,
            footer: None,
        };
        assemble(
            DocumentMetadata {
                company: company.to_string(),
                period: "2024 H1".to_string(),
                generated_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            },
            vec![page],
            RasterStats::default(),
        )
        .unwrap()
    }

    // ── naming ──────────────────────────────────────────────────────────────

    #[test]
    fn test_stem_replaces_whitespace() {
        assert_eq!(
            artifact_stem("Acme  Foods S.A.", "2024 H1"),
            "Diagnostico_Acme_Foods_S.A._2024_H1"
        );
    }

    #[test]
    fn test_stem_drops_path_separators() {
        assert_eq!(artifact_stem("../etc/passwd", "2024"), "Diagnostico_..etcpasswd_2024");
    }

    #[test]
    fn test_stem_parts_are_capped() {
        let stem = artifact_stem(&"Comercializadora Ñandú ".repeat(100), &"2024 ".repeat(100));
        assert!(stem.len() <= ARTIFACT_PREFIX.len() + 2 * (STEM_PART_MAX_BYTES + 1));
        assert!(stem.starts_with("Diagnostico_Comercializadora_Ñandú_"));
        assert!(!stem.contains("__"));
        assert!(!stem.ends_with('_'));
    }

    #[test]
    fn test_stem_skips_empty_period() {
        assert_eq!(artifact_stem("Acme", "  "), "Diagnostico_Acme");
    }

    // ── fingerprint ─────────────────────────────────────────────────────────

    #[test]
    fn test_fingerprint_stable_and_sensitive() {
        let a = fingerprint(&document("Acme")).unwrap();
        assert_eq!(a.len(), 64);
        assert!(a.bytes().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        let json = serde_json::to_vec(&document("Acme")).unwrap();
        assert_eq!(hex::decode(&a).unwrap(), Sha256::digest(&json).to_vec());
        assert_eq!(a, fingerprint(&document("Acme")).unwrap());
        assert_ne!(a, fingerprint(&document("Other")).unwrap());
    }

    #[test]
    fn test_build_artifact_contents() {
        let artifact = build_artifact(&document("Acme Foods")).unwrap();
        assert_eq!(artifact.html_file_name(), "Diagnostico_Acme_Foods_2024_H1.html");
        assert!(std::str::from_utf8(&artifact.html).unwrap().contains("Page 1 of 1"));
        let back: Document = serde_json::from_slice(&artifact.json).unwrap();
        assert_eq!(back, document("Acme Foods"));
    }

    // ── persistence ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_persist_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested");
        let artifact = build_artifact(&document("Acme")).unwrap();
        let persisted = persist_artifact(&artifact, &target).await.unwrap();

        assert_eq!(std::fs::read(&persisted.html_path).unwrap(), artifact.html.to_vec());
        assert_eq!(std::fs::read(&persisted.json_path).unwrap(), artifact.json.to_vec());
        // Only the two artifacts remain; temp files were renamed away.
        assert_eq!(std::fs::read_dir(&target).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_persist_overwrites_existing() {
        let dir = tempfile::tempdir().unwrap();
        let first = build_artifact(&document("Acme")).unwrap();
        persist_artifact(&first, dir.path()).await.unwrap();
        let persisted = persist_artifact(&first, dir.path()).await.unwrap();
        assert!(persisted.html_path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}
