//! Input resolution: validate a user-supplied path before pdfium sees it.
//!
//! We check the `%PDF` magic bytes up front so callers get a meaningful
//! error rather than a pdfium parse failure deep inside the run.

use crate::error::TranscriptError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve a local file path, validating existence and PDF magic bytes.
pub fn resolve_input(path_str: &str) -> Result<PathBuf, TranscriptError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(TranscriptError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(TranscriptError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(TranscriptError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(TranscriptError::FileNotFound { path });
        }
    }

    debug!("Resolved input PDF: {}", path.display());
    Ok(path)
}

/// The output file name for a source document: its base name with `.txt`.
pub fn default_output_name(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "transcript".to_string());
    PathBuf::from(format!("{stem}.txt"))
}
