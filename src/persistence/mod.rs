//! Single-file store for the tool index.
//!
//! The file holds one row per tool (`id`, `name`, `description`, embedding)
//! plus the HNSW parameters the graph was built with. The graph itself is
//! rebuilt from the rows on load. Sessions delete the file at startup and
//! write it again after every build; it is never read back across runs.

use crate::error::{AppError, Result};
use crate::index::{HnswParams, IndexEntry, SearchMode, VectorIndex};
use crate::inference::Embedding;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// File format version. Increment when format changes.
const FORMAT_VERSION: u32 = 1;

/// Magic bytes to identify valid index files.
const FILE_MAGIC: &[u8; 8] = b"DYNATOOL";

/// Upper bound for a single name/description field, guards against reading
/// garbage lengths from a corrupt file.
const MAX_FIELD_BYTES: usize = 1 << 20;

/// Upper bound for the stored embedding dimension.
const MAX_DIMENSION: usize = 1 << 16;

/// SHA-256 over the catalog rows, stored in the header.
pub fn catalog_hash(entries: &[IndexEntry]) -> [u8; 32] {
    let mut hasher = Sha256::new();

    for entry in entries {
        hasher.update((entry.id as u64).to_le_bytes());
        hasher.update(entry.name.as_bytes());
        hasher.update(b"|");
        hasher.update(entry.description.as_bytes());
        hasher.update(b"\n");
    }

    hasher.finalize().into()
}

/// Remove a stale index file. A missing file is not an error.
pub fn remove_index_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "Removed previous index file");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::IndexError(format!(
            "Failed to remove index file {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Write the index to `path`.
///
/// File format (little endian):
/// - 8 bytes: magic "DYNATOOL"
/// - 4 bytes: version (u32)
/// - 32 bytes: catalog hash
/// - 8 bytes: number of rows (u64)
/// - 8 bytes: embedding dimension (u64)
/// - 3 x 4 bytes: max_connections, ef_construction, ef_search (u32)
/// - per row: id (u64), name (u32 length + UTF-8), description
///   (u32 length + UTF-8), embedding (dim x f32)
pub fn save_index(path: &Path, index: &VectorIndex) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    let entries = index.entries();
    let params = index.params();
    let dim = index.dimension();

    writer.write_all(FILE_MAGIC)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
    writer.write_all(&catalog_hash(entries))?;
    writer.write_all(&(entries.len() as u64).to_le_bytes())?;
    writer.write_all(&(dim as u64).to_le_bytes())?;
    for value in [params.max_connections, params.ef_construction, params.ef_search] {
        writer.write_all(&(value as u32).to_le_bytes())?;
    }

    for entry in entries {
        writer.write_all(&(entry.id as u64).to_le_bytes())?;
        write_str(&mut writer, &entry.name)?;
        write_str(&mut writer, &entry.description)?;
        for &val in entry.embedding.as_slice() {
            writer.write_all(&val.to_le_bytes())?;
        }
    }

    writer.flush()?;

    tracing::info!(
        path = %path.display(),
        entries = entries.len(),
        embedding_dim = dim,
        "Index file saved"
    );

    Ok(())
}

/// Read an index written by `save_index` and rebuild it in memory.
///
/// Returns `Ok(None)` when the file does not exist or carries a foreign
/// magic/version.
pub fn load_index(path: &Path, mode: SearchMode) -> Result<Option<VectorIndex>> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "Index file does not exist");
        return Ok(None);
    }

    let mut reader = BufReader::new(File::open(path)?);

    let mut magic = [0u8; 8];
    if reader.read_exact(&mut magic).is_err() || &magic != FILE_MAGIC {
        tracing::warn!(path = %path.display(), "Invalid index file magic, ignoring");
        return Ok(None);
    }

    let version = read_u32(&mut reader)?;
    if version != FORMAT_VERSION {
        tracing::warn!(
            path = %path.display(),
            file_version = version,
            expected_version = FORMAT_VERSION,
            "Index file version mismatch, ignoring"
        );
        return Ok(None);
    }

    let mut stored_hash = [0u8; 32];
    reader.read_exact(&mut stored_hash)?;
    let num_entries = read_u64(&mut reader)? as usize;
    let dim = read_u64(&mut reader)? as usize;
    if dim > MAX_DIMENSION {
        return Err(AppError::IndexError(format!(
            "Index dimension {} exceeds limit",
            dim
        )));
    }
    let params = HnswParams {
        max_connections: read_u32(&mut reader)? as usize,
        ef_construction: read_u32(&mut reader)? as usize,
        ef_search: read_u32(&mut reader)? as usize,
    };

    let mut entries = Vec::with_capacity(num_entries.min(4096));
    for _ in 0..num_entries {
        let id = read_u64(&mut reader)? as usize;
        let name = read_str(&mut reader)?;
        let description = read_str(&mut reader)?;
        let mut values = Vec::with_capacity(dim);
        for _ in 0..dim {
            let mut bytes = [0u8; 4];
            reader.read_exact(&mut bytes)?;
            values.push(f32::from_le_bytes(bytes));
        }
        entries.push(IndexEntry {
            id,
            name,
            description,
            embedding: Embedding::from_stored(values)?,
        });
    }

    if catalog_hash(&entries) != stored_hash {
        return Err(AppError::IndexError(format!(
            "Index file {} failed its integrity check",
            path.display()
        )));
    }

    let mut index = VectorIndex::new(params, mode);
    index.build(entries)?;

    tracing::info!(
        path = %path.display(),
        entries = index.len(),
        embedding_dim = dim,
        "Index file loaded"
    );

    Ok(Some(index))
}

fn write_str(writer: &mut impl Write, value: &str) -> Result<()> {
    writer.write_all(&(value.len() as u32).to_le_bytes())?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

fn read_str(reader: &mut impl Read) -> Result<String> {
    let len = read_u32(reader)? as usize;
    if len > MAX_FIELD_BYTES {
        return Err(AppError::IndexError(format!(
            "Index field length {} exceeds limit",
            len
        )));
    }
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes)
        .map_err(|e| AppError::IndexError(format!("Index field is not UTF-8: {}", e)))
}

fn read_u32(reader: &mut impl Read) -> Result<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_u64(reader: &mut impl Read) -> Result<u64> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes)?;
    Ok(u64::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{Encoder, HashingEncoder};
    use tempfile::tempdir;

    fn make_entries(names: &[&str]) -> Vec<IndexEntry> {
        let encoder = HashingEncoder::default();
        names
            .iter()
            .enumerate()
            .map(|(id, name)| IndexEntry {
                id,
                name: name.to_string(),
                description: format!("{} description", name),
                embedding: encoder.encode(name).unwrap(),
            })
            .collect()
    }

    fn make_index(names: &[&str]) -> VectorIndex {
        let mut index = VectorIndex::new(HnswParams::default(), SearchMode::Hnsw);
        index.build(make_entries(names)).unwrap();
        index
    }

    #[test]
    fn test_hash_changes_with_catalog() {
        let hash1 = catalog_hash(&make_entries(&["tool1"]));
        let hash2 = catalog_hash(&make_entries(&["tool2"]));
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tools.idx");

        let index = make_index(&["add", "to_upper", "get_weather"]);
        save_index(&path, &index).unwrap();

        let loaded = load_index(&path, SearchMode::Hnsw).unwrap().unwrap();
        assert_eq!(loaded.entries(), index.entries());
        assert_eq!(loaded.params(), index.params());
        assert_eq!(loaded.dimension(), 384);
    }

    #[test]
    fn test_missing_file_loads_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.idx");
        assert!(load_index(&path, SearchMode::Exact).unwrap().is_none());
        // Removing a missing file is fine too
        remove_index_file(&path).unwrap();
    }

    #[test]
    fn test_foreign_file_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tools.idx");
        fs::write(&path, b"NOTANINDEXFILE").unwrap();
        assert!(load_index(&path, SearchMode::Exact).unwrap().is_none());
    }

    #[test]
    fn test_oversized_dimension_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tools.idx");
        save_index(&path, &make_index(&["add"])).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        let dim_offset = 8 + 4 + 32 + 8;
        bytes[dim_offset..dim_offset + 8].copy_from_slice(&u64::MAX.to_le_bytes());
        fs::write(&path, bytes).unwrap();

        let err = load_index(&path, SearchMode::Exact).unwrap_err();
        assert!(err.to_string().contains("exceeds limit"));
    }

    #[test]
    fn test_corrupted_row_fails_integrity_check() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tools.idx");
        save_index(&path, &make_index(&["add", "subtract"])).unwrap();

        // Flip a byte inside the first tool name ("add" -> "bdd")
        let mut bytes = fs::read(&path).unwrap();
        let header = 8 + 4 + 32 + 8 + 8 + 12;
        let name_offset = header + 8 + 4;
        bytes[name_offset] = b'b';
        fs::write(&path, bytes).unwrap();

        assert!(matches!(
            load_index(&path, SearchMode::Exact),
            Err(AppError::IndexError(_))
        ));
    }

    #[test]
    fn test_remove_index_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("tools.idx");
        save_index(&path, &make_index(&["add"])).unwrap();
        assert!(path.exists());
        remove_index_file(&path).unwrap();
        assert!(!path.exists());
    }
}
