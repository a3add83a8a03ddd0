use std::fs::{self, File};
use std::io::{BufReader, Read};

use camino::{Utf8Path, Utf8PathBuf};
use convoy_core::{format_timestamp, FileRecord, Manifest};
use md5::Context;
use rayon::prelude::*;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Walk the tree under `root` and produce a manifest of every file,
/// skipping the metadata subtree named by `exclude`.
///
/// A file that disappears, becomes unreadable mid-scan, or carries a
/// non-UTF8 name is skipped with a warning; the scan itself only fails
/// when the root cannot be walked at all. No network access, no writes.
pub fn scan(root: &Utf8Path, exclude: &str, editor: &str) -> Result<Manifest, ScanError> {
    info!("Scanning {}", root);

    if !root.is_dir() {
        return Err(ScanError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("scan root is not a directory: {root}"),
        )));
    }

    let mut files: Vec<(Utf8PathBuf, String)> = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root, e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let abs = match Utf8PathBuf::from_path_buf(entry.path().to_path_buf()) {
            Ok(abs) => abs,
            Err(p) => {
                // Ledger paths are UTF-8; such a file can never sync.
                warn!("Skipping non-UTF8 path under {}: {}", root, p.display());
                continue;
            }
        };
        let rel = abs
            .strip_prefix(root)
            .map(|p| p.as_str().replace('\\', "/"))
            .unwrap_or_else(|_| abs.as_str().to_string());

        if rel == exclude || rel.starts_with(&format!("{exclude}/")) {
            continue;
        }
        files.push((abs, rel));
    }

    let records: Vec<Option<FileRecord>> = files
        .par_iter()
        .map(|(abs, rel)| match scan_one(abs, rel, editor) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping unreadable file {}: {}", abs, e);
                None
            }
        })
        .collect();

    let manifest: Manifest = records.into_iter().flatten().collect();
    debug!("Scanned {} files under {}", manifest.len(), root);
    Ok(manifest)
}

fn scan_one(abs: &Utf8Path, rel: &str, editor: &str) -> std::io::Result<FileRecord> {
    let meta = fs::metadata(abs)?;
    let modified = meta
        .modified()
        .map(format_timestamp)
        .unwrap_or_else(|_| convoy_core::timestamp_now());

    Ok(FileRecord {
        path: rel.to_string(),
        editor: editor.to_string(),
        modified,
        checksum: file_checksum(abs)?,
    })
}

/// MD5 of the file bytes, lowercase hex, streamed in fixed chunks.
pub fn file_checksum(path: &Utf8Path) -> std::io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Context::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.consume(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Utf8Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, root)
    }

    #[test]
    fn scan_skips_the_metadata_subtree() {
        let (_guard, root) = temp_root();
        write(&root, "data.txt", "hello");
        write(&root, "nested/inner.txt", "world");
        write(&root, ".convoy/versions.csv", "path,editor,modified,checksum");

        let manifest = scan(&root, ".convoy", "alice").unwrap();

        let paths: Vec<_> = manifest.paths().collect();
        assert_eq!(paths, vec!["data.txt", "nested/inner.txt"]);
    }

    #[test]
    fn records_carry_editor_and_md5() {
        let (_guard, root) = temp_root();
        write(&root, "a.txt", "hello");

        let manifest = scan(&root, ".convoy", "bob").unwrap();
        let record = manifest.get("a.txt").unwrap();

        assert_eq!(record.editor, "bob");
        // md5 of "hello"
        assert_eq!(record.checksum, "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(record.modified.len(), "2024-01-01 00:00:00".len());
    }

    #[test]
    fn identical_content_hashes_identically_across_paths() {
        let (_guard, root) = temp_root();
        write(&root, "one.txt", "same bytes");
        write(&root, "two.txt", "same bytes");

        let manifest = scan(&root, ".convoy", "alice").unwrap();
        assert_eq!(
            manifest.get("one.txt").unwrap().checksum,
            manifest.get("two.txt").unwrap().checksum
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_file_name_is_skipped() {
        use std::os::unix::ffi::OsStrExt;

        let (_guard, root) = temp_root();
        write(&root, "ok.txt", "data");
        let bad = root
            .as_std_path()
            .join(std::ffi::OsStr::from_bytes(b"bad-\xff.txt"));
        std::fs::write(bad, "junk").unwrap();

        let manifest = scan(&root, ".convoy", "alice").unwrap();

        let paths: Vec<_> = manifest.paths().collect();
        assert_eq!(paths, vec!["ok.txt"]);
    }

    #[test]
    fn empty_directory_scans_to_empty_manifest() {
        let (_guard, root) = temp_root();
        let manifest = scan(&root, ".convoy", "alice").unwrap();
        assert!(manifest.is_empty());
    }
}
