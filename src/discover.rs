use crate::LensError;
use log::{debug, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// A transcript file selected for analysis.
#[derive(Debug, Clone)]
pub struct TranscriptFile {
    pub path: PathBuf,
    /// Name of the project directory the file lives in.
    pub project_dir: String,
    pub modified: SystemTime,
}

/// List `<root>/<project>/*.jsonl` files modified within `days` of `now`,
/// optionally restricted to project directories containing `project`
/// (case-insensitive). Newest first.
///
/// A missing root yields an empty list; an unreadable root is an error.
pub fn discover(
    root: &Path,
    days: u32,
    project: Option<&str>,
    now: SystemTime,
) -> Result<Vec<TranscriptFile>, LensError> {
    let root_error = |source| LensError::Root {
        path: root.to_path_buf(),
        source,
    };
    match std::fs::metadata(root) {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("projects dir {} does not exist", root.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(root_error(e)),
    }

    let entries = std::fs::read_dir(root).map_err(root_error)?;

    let cutoff = now
        .checked_sub(Duration::from_secs(u64::from(days) * 86400))
        .unwrap_or(SystemTime::UNIX_EPOCH);
    let needle = project.map(str::to_lowercase);

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(root_error)?;
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }
        let project_dir = entry.file_name().to_string_lossy().into_owned();
        if let Some(needle) = &needle
            && !project_dir.to_lowercase().contains(needle.as_str())
        {
            continue;
        }

        let listing = match std::fs::read_dir(&dir) {
            Ok(l) => l,
            Err(e) => {
                warn!("skipping {}: {e}", dir.display());
                continue;
            }
        };

        for file in listing.flatten() {
            let path = file.path();
            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }
            let meta = match std::fs::metadata(&path) {
                Ok(m) => m,
                Err(e) => {
                    warn!("skipping {}: {e}", path.display());
                    continue;
                }
            };
            if !meta.is_file() {
                continue;
            }
            let modified = match meta.modified() {
                Ok(t) => t,
                Err(e) => {
                    warn!("skipping {}: {e}", path.display());
                    continue;
                }
            };
            if modified < cutoff {
                continue;
            }
            files.push(TranscriptFile {
                path,
                project_dir: project_dir.clone(),
                modified,
            });
        }
    }

    files.sort_by(|a, b| b.modified.cmp(&a.modified));
    debug!("found {} transcripts under {}", files.len(), root.display());
    Ok(files)
}
