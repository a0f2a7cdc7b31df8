use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct WriteOutcome {
    pub sha256: String,
    pub written: bool,
    pub bytes: usize,
}

pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn file_hash(path: &Path) -> Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(Some(content_hash(&bytes)))
}

pub fn render_pretty<T: Serialize>(value: &T) -> Result<String> {
    let data = serde_json::to_string_pretty(value)?;
    Ok(format!("{data}\n"))
}

/// Write `contents` to `path` through a temp file in the same directory.
///
/// An existing file with identical contents is left untouched.
pub fn write_if_changed(path: &Path, contents: &str) -> Result<WriteOutcome> {
    let sha256 = content_hash(contents.as_bytes());
    let bytes = contents.len();
    if file_hash(path)?.as_deref() == Some(sha256.as_str()) {
        return Ok(WriteOutcome {
            sha256,
            written: false,
            bytes,
        });
    }

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
    tmp.write_all(contents.as_bytes())?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to write {}", path.display()))?;

    Ok(WriteOutcome {
        sha256,
        written: true,
        bytes,
    })
}

pub fn read_json(path: &Path) -> Result<Value> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn unchanged_contents_are_not_rewritten() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("nested/outbox.json");

        let first = write_if_changed(&path, "{}\n").expect("first write");
        assert!(first.written);
        let second = write_if_changed(&path, "{}\n").expect("second write");
        assert!(!second.written);
        assert_eq!(first.sha256, second.sha256);

        let third = write_if_changed(&path, "[]\n").expect("third write");
        assert!(third.written);
        assert_eq!(fs::read_to_string(&path).expect("read"), "[]\n");
    }

    #[test]
    fn hash_is_hex_sha256() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
