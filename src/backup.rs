use crate::records::{render_records, StudentRecord};
use anyhow::{anyhow, Context};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const DATA_ENTRY: &str = "data/studentMarks.txt";
pub const BUNDLE_FORMAT_V1: &str = "student-records-v1";
pub const PLAIN_TEXT_FORMAT: &str = "plain-text";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
    pub record_count: usize,
    pub sha256: String,
}

#[derive(Debug, Clone)]
pub struct ImportedBundle {
    pub bundle_format_detected: String,
    /// Records file contents, not yet parsed.
    pub text: String,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Bundles the given records, rendered in the store file format. The caller
/// passes what it holds in memory, which may be ahead of the file on disk.
pub fn export_store_bundle(
    records: &[StudentRecord],
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    let data = render_records(records);
    let record_count = records.len();
    let checksum = sha256_hex(data.as_bytes());

    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }

    let out_file = File::create(out_path)
        .with_context(|| format!("failed to create output file {}", out_path.display()))?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "recordCount": record_count,
        "sha256": checksum,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.start_file(DATA_ENTRY, opts)
        .context("failed to start records entry")?;
    zip.write_all(data.as_bytes())
        .context("failed to write records entry")?;

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: 2,
        record_count,
        sha256: checksum,
    })
}

/// Reads a bundle written by [`export_store_bundle`], or a bare records file.
/// Zip bundles must carry the expected format and a matching checksum.
pub fn import_store_bundle(in_path: &Path) -> anyhow::Result<ImportedBundle> {
    if !is_zip_file(in_path)? {
        let bytes = std::fs::read(in_path)
            .with_context(|| format!("failed to read records file {}", in_path.display()))?;
        return Ok(ImportedBundle {
            bundle_format_detected: PLAIN_TEXT_FORMAT.to_string(),
            text: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }

    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.display()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let mut data = Vec::new();
    archive
        .by_name(DATA_ENTRY)
        .with_context(|| format!("bundle missing {}", DATA_ENTRY))?
        .read_to_end(&mut data)
        .context("failed to extract records entry")?;

    if let Some(expected) = manifest.get("sha256").and_then(|v| v.as_str()) {
        let actual = sha256_hex(&data);
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(anyhow!(
                "records checksum mismatch: manifest {}, bundle {}",
                expected,
                actual
            ));
        }
    }

    Ok(ImportedBundle {
        bundle_format_detected: BUNDLE_FORMAT_V1.to_string(),
        text: String::from_utf8_lossy(&data).into_owned(),
    })
}

fn is_zip_file(path: &Path) -> anyhow::Result<bool> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.display()))?;
    let mut sig = [0u8; 4];
    let read = f.read(&mut sig).context("failed to read file signature")?;
    if read < 4 {
        return Ok(false);
    }
    Ok(sig == [0x50, 0x4B, 0x03, 0x04])
}
