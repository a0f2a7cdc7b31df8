use crate::archive::merge::SkippedSource;
use crate::archive::source::RawArchiveDocument;
use crate::archive::warn;
use crate::error::SourceRejection;
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct LoadedSources {
    pub files_found: usize,
    pub documents: Vec<RawArchiveDocument>,
    pub skipped: Vec<SkippedSource>,
}

fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let read_dir =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    for entry in read_dir {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_json_files(&path, out)?;
        } else if file_type.is_file()
            && path.extension().and_then(|ext| ext.to_str()) == Some("json")
        {
            out.push(path);
        }
    }
    Ok(())
}

/// Every `.json` file below `dir`, sorted by path.
///
/// Directory listing order is platform dependent and the merge keeps the
/// first copy of a duplicated post, so the result is always sorted.
pub fn find_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        tracing::info!(dir = %dir.display(), "archives directory does not exist");
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    collect_json_files(dir, &mut out)?;
    out.sort();
    Ok(out)
}

fn origin_label(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Read and parse every archive document below `dir`.
///
/// `exclude` is skipped silently so that an outbox written inside the
/// archives directory is not merged back into itself.
pub fn load_documents(dir: &Path, exclude: Option<&Path>) -> Result<LoadedSources> {
    let files = find_json_files(dir)?;
    let mut out = LoadedSources::default();

    for path in files {
        if exclude.is_some_and(|skip| same_file(skip, &path)) {
            continue;
        }
        out.files_found += 1;
        let origin = origin_label(dir, &path);

        let parsed = fs::read_to_string(&path)
            .map_err(|err| err.to_string())
            .and_then(|raw| serde_json::from_str::<Value>(&raw).map_err(|err| err.to_string()));
        match parsed {
            Ok(body) => {
                let order = out.documents.len();
                out.documents.push(RawArchiveDocument::new(origin, order, body));
            }
            Err(err) => {
                let reason = SourceRejection::Unparseable(err);
                warn::emit(reason.code(), "discover", &origin, &reason.to_string());
                out.skipped.push(SkippedSource { origin, reason });
            }
        }
    }

    Ok(out)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
