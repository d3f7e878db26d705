//! Archive codec.
//!
//! An archive is a ZIP container holding exactly one `data.json` entry (the
//! serialized [`Snapshot`]) and one `images/<uuid>` entry per image whose
//! bytes were available at export time. Encoding and decoding happen entirely
//! in memory; each call builds its own writer or reader.

use crate::portable::{is_supported_version, Snapshot};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read, Write};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Name of the mandatory record entry
pub const DATA_ENTRY: &str = "data.json";

/// Directory prefix of image entries
pub const IMAGE_PREFIX: &str = "images/";

/// Upper bound on the decompressed size of a single entry
pub const MAX_ENTRY_BYTES: u64 = 256 * 1024 * 1024;

/// Error type for archive encoding and decoding
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("data.json missing in archive")]
    MissingData,

    #[error("Unsupported archive version {0}")]
    UnsupportedVersion(String),

    #[error("Archive entry {0} exceeds the size limit")]
    EntryTooLarge(String),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data.json: {0}")]
    Json(#[from] serde_json::Error),
}

/// A decoded archive
#[derive(Debug, Clone)]
pub struct ArchiveContents {
    pub snapshot: Snapshot,
    /// Image bytes keyed by image uuid
    pub images: HashMap<Uuid, Vec<u8>>,
}

/// Bytes for an image record; empty when the archive carried none
pub fn image_bytes<'a>(images: &'a HashMap<Uuid, Vec<u8>>, uuid: &Uuid) -> &'a [u8] {
    images.get(uuid).map(Vec::as_slice).unwrap_or(&[])
}

/// Entry name for an image's bytes
pub fn image_entry_name(uuid: &Uuid) -> String {
    format!("{}{}", IMAGE_PREFIX, uuid)
}

/// Lowercase hex SHA-256 of a byte slice
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Encode a snapshot and its image bytes into a ZIP archive.
///
/// Only images that have a record in the snapshot are written.
pub fn encode(
    snapshot: &Snapshot,
    images: &BTreeMap<Uuid, Vec<u8>>,
) -> Result<Vec<u8>, ArchiveError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let data = serde_json::to_vec_pretty(snapshot)?;
    zip.start_file(DATA_ENTRY, options)?;
    zip.write_all(&data)?;

    let mut written = 0usize;
    for record in &snapshot.images {
        if let Some(bytes) = images.get(&record.uuid) {
            zip.start_file(image_entry_name(&record.uuid), options)?;
            zip.write_all(bytes)?;
            written += 1;
        }
    }

    let cursor = zip.finish()?;
    tracing::debug!(
        records = snapshot.len(),
        images = written,
        "Encoded archive"
    );
    Ok(cursor.into_inner())
}

/// Decode a ZIP archive produced by [`encode`].
///
/// Fails closed: a missing `data.json`, a corrupt container, invalid JSON or
/// an unsupported format version are all errors. Entries that are neither
/// `data.json` nor a well-named image are ignored.
pub fn decode(bytes: &[u8]) -> Result<ArchiveContents, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let mut snapshot: Option<Snapshot> = None;
    let mut images = HashMap::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();

        if name == DATA_ENTRY {
            let data = read_entry(&mut entry, &name)?;
            snapshot = Some(serde_json::from_slice(&data)?);
        } else if let Some(suffix) = name.strip_prefix(IMAGE_PREFIX) {
            match Uuid::parse_str(suffix) {
                Ok(uuid) => {
                    let data = read_entry(&mut entry, &name)?;
                    images.insert(uuid, data);
                }
                Err(_) => tracing::warn!("Ignoring image entry with invalid name: {}", name),
            }
        } else {
            tracing::debug!("Ignoring unknown archive entry: {}", name);
        }
    }

    let snapshot = snapshot.ok_or(ArchiveError::MissingData)?;
    if !is_supported_version(&snapshot.version) {
        return Err(ArchiveError::UnsupportedVersion(snapshot.version));
    }

    Ok(ArchiveContents { snapshot, images })
}

/// Read a whole entry, refusing anything larger than [`MAX_ENTRY_BYTES`]
fn read_entry<R: Read>(entry: &mut R, name: &str) -> Result<Vec<u8>, ArchiveError> {
    let mut data = Vec::new();
    entry.take(MAX_ENTRY_BYTES + 1).read_to_end(&mut data)?;
    if data.len() as u64 > MAX_ENTRY_BYTES {
        return Err(ArchiveError::EntryTooLarge(name.to_string()));
    }
    Ok(data)
}
