// Cross-platform file utilities

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// File utilities for cross-platform operations
pub struct FileUtils;

impl FileUtils {
    /// Collect all .xml files below a directory (or the file itself)
    pub fn collect_report_files(path: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();

        if path.is_file() {
            files.push(path.to_path_buf());
        } else if path.is_dir() {
            let walker = walkdir::WalkDir::new(path).into_iter().filter_entry(|e| {
                // Always include the root directory itself, even if it starts with '.'
                if e.depth() == 0 {
                    return true;
                }
                !e.file_name().to_string_lossy().starts_with('.')
            });

            for entry in walker {
                match entry {
                    Ok(entry) => {
                        if entry.file_type().is_file() && Self::is_xml_file(entry.path()) {
                            files.push(entry.path().to_path_buf());
                        }
                    }
                    Err(e) => debug!("Skipping unreadable entry under {}: {}", path.display(), e),
                }
            }
        } else {
            debug!("{} does not exist yet", path.display());
        }

        files
    }

    /// Check if file has .xml extension
    pub fn is_xml_file(path: &Path) -> bool {
        path.extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("xml"))
    }

    /// Get file modification time
    pub fn get_mtime(path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }

    /// Read the whole file
    pub fn read_bytes(path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    /// Read at most the last `len` bytes of a file
    pub fn read_tail(path: &Path, len: u64) -> io::Result<Vec<u8>> {
        let mut file = File::open(path)?;
        let size = file.metadata()?.len();
        let start = size.saturating_sub(len);
        file.seek(SeekFrom::Start(start))?;

        let mut tail = Vec::with_capacity((size - start) as usize);
        file.read_to_end(&mut tail)?;
        Ok(tail)
    }

    /// Normalize path separators (backslash to forward slash)
    pub fn normalize_path_separators(path: &str) -> String {
        path.replace('\\', "/")
    }

    /// Turn a path found inside a report into a checkout-relative,
    /// forward-slash path. Paths outside the checkout keep their
    /// normalized absolute form minus the leading separator.
    pub fn resolve_source_path(path: &str, checkout_dir: &str) -> String {
        let path = Self::normalize_path_separators(path);
        let checkout = Self::normalize_path_separators(checkout_dir);

        let relative = if !checkout.is_empty() {
            path.strip_prefix(checkout.as_str()).unwrap_or(&path)
        } else {
            &path
        };

        relative.trim_start_matches('/').to_string()
    }
}
