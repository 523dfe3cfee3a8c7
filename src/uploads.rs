// Parking Vecinal - Receipt file storage
// A flat directory of uploaded receipt images/PDFs. Stored names are
// collision-resistant (UTC timestamp + random suffix) and only the
// allow-listed extensions are ever written.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;

/// The only extensions a receipt may carry.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "pdf"];

/// Lowercased extension of a filename, if it has one.
fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// True when the filename carries an allow-listed extension.
pub fn allowed_file(filename: &str) -> bool {
    extension(filename).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// Build the stored name for an upload: `<timestamp>_<suffix>.<ext>`.
///
/// The timestamp is UTC `%Y%m%d%H%M%S` plus fractional seconds, already
/// free of separators; the suffix is the first 8 hex chars of a random
/// UUID. Returns None when the extension is not allow-listed, in which
/// case nothing may be written to disk.
pub fn stored_filename(original: &str) -> Option<String> {
    let ext = extension(original)?;
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }

    let timestamp = Utc::now().format("%Y%m%d%H%M%S%f");
    let suffix = &uuid::Uuid::new_v4().simple().to_string()[..8];

    Some(format!("{timestamp}_{suffix}.{ext}"))
}

pub fn save_receipt(upload_dir: &Path, filename: &str, bytes: &[u8]) -> Result<()> {
    let path = upload_dir.join(filename);
    fs::write(&path, bytes).with_context(|| format!("Failed to write receipt {path:?}"))?;

    Ok(())
}

/// Remove a stored receipt. A file already gone is not an error: the
/// row is the source of truth and cleanup is best-effort.
pub fn delete_receipt(upload_dir: &Path, filename: &str) -> Result<()> {
    let path = upload_dir.join(filename);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to delete receipt {path:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_file() {
        assert!(allowed_file("nota.png"));
        assert!(allowed_file("NOTA.JPG"));
        assert!(allowed_file("deposito.enero.pdf"));
        assert!(!allowed_file("nota.txt"));
        assert!(!allowed_file("nota"));
        assert!(!allowed_file("nota."));
        assert!(allowed_file(".png")); // no stem, but the extension decides
    }

    #[test]
    fn test_stored_filename_shape() {
        let name = stored_filename("Recibo Enero.PDF").unwrap();
        assert!(name.ends_with(".pdf"));

        let (stem, _) = name.rsplit_once('.').unwrap();
        let (timestamp, suffix) = stem.split_once('_').unwrap();
        assert!(timestamp.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_stored_filename_rejects_disallowed() {
        assert!(stored_filename("nota.txt").is_none());
        assert!(stored_filename("nota").is_none());
        assert!(stored_filename("nota.pdf.exe").is_none());
    }

    #[test]
    fn test_stored_filename_unique() {
        let a = stored_filename("nota.png").unwrap();
        let b = stored_filename("nota.png").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_save_and_delete_receipt() {
        let dir = tempfile::tempdir().unwrap();

        save_receipt(dir.path(), "r1.png", b"png bytes").unwrap();
        assert!(dir.path().join("r1.png").exists());

        delete_receipt(dir.path(), "r1.png").unwrap();
        assert!(!dir.path().join("r1.png").exists());

        // Deleting a missing file is fine
        delete_receipt(dir.path(), "r1.png").unwrap();
    }
}
