use std::fs;
use std::io;
use std::path::Path;
use tracing::{info, warn};

pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// A file taken from a multipart form, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub fn allowed_file(file_name: &str) -> bool {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Reduces a client-supplied name to a safe single path component made of
/// ASCII letters, digits, `.`, `-` and `_`.
pub fn secure_filename(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    cleaned.trim_start_matches(['.', '_']).to_string()
}

/// `<stem>_<timestamp>.<ext>` for an allowed file, `None` otherwise. The
/// extension keeps the case it was uploaded with.
pub fn unique_name(file_name: &str, timestamp: i64) -> Option<String> {
    if !allowed_file(file_name) {
        return None;
    }
    let (raw_stem, ext) = file_name.rsplit_once('.')?;
    let stem = secure_filename(raw_stem);
    let stem = if stem.is_empty() { "upload" } else { stem.as_str() };
    Some(format!("{}_{}.{}", stem, timestamp, ext))
}

/// Writes an accepted upload into `dir` and returns the stored file name.
/// Disallowed or empty uploads are skipped and yield `Ok(None)`.
pub fn store(dir: &Path, upload: &Upload, timestamp: i64) -> io::Result<Option<String>> {
    if upload.file_name.is_empty() {
        return Ok(None);
    }
    let Some(name) = unique_name(&upload.file_name, timestamp) else {
        warn!(file_name = %upload.file_name, "upload rejected: extension not allowed");
        return Ok(None);
    };

    fs::create_dir_all(dir)?;
    fs::write(dir.join(&name), &upload.bytes)?;
    info!(stored = %name, bytes = upload.bytes.len(), "upload stored");
    Ok(Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn extension_allow_list_is_case_insensitive() {
        assert!(allowed_file("photo.png"));
        assert!(allowed_file("photo.PNG"));
        assert!(allowed_file("archive.tar.JpEg"));
        assert!(!allowed_file("photo.exe"));
        assert!(!allowed_file("photo"));
        assert!(!allowed_file("png"));
    }

    #[test]
    fn secure_filename_strips_paths_and_junk() {
        assert_eq!(secure_filename("../../etc/passwd"), "passwd");
        assert_eq!(secure_filename("C:\\Users\\me\\My Photo.png"), "My_Photo.png");
        assert_eq!(secure_filename(".hidden.gif"), "hidden.gif");
        assert_eq!(secure_filename("a<b>c.webp"), "abc.webp");
    }

    #[test]
    fn unique_name_keeps_stem_and_extension_case() {
        assert_eq!(
            unique_name("photo.PNG", 1_700_000_000).as_deref(),
            Some("photo_1700000000.PNG")
        );
        assert_eq!(
            unique_name("my trip.jpeg", 5).as_deref(),
            Some("my_trip_5.jpeg")
        );
        assert_eq!(unique_name("photo.exe", 5), None);
    }

    #[test]
    fn unique_name_falls_back_when_stem_is_lost() {
        assert_eq!(unique_name("日本.png", 9).as_deref(), Some("upload_9.png"));
    }

    #[test]
    fn store_writes_accepted_files() {
        let dir = TempDir::new().unwrap();
        let uploads = dir.path().join("uploads");
        let upload = Upload {
            file_name: "photo.PNG".into(),
            bytes: vec![1, 2, 3],
        };

        let stored = store(&uploads, &upload, 42).unwrap();
        assert_eq!(stored.as_deref(), Some("photo_42.PNG"));
        assert_eq!(fs::read(uploads.join("photo_42.PNG")).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn store_ignores_rejected_files() {
        let dir = TempDir::new().unwrap();
        let upload = Upload {
            file_name: "photo.exe".into(),
            bytes: vec![0; 8],
        };
        assert_eq!(store(dir.path(), &upload, 42).unwrap(), None);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

        let unnamed = Upload {
            file_name: String::new(),
            bytes: Vec::new(),
        };
        assert_eq!(store(dir.path(), &unnamed, 42).unwrap(), None);
    }
}
