use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

/// Extensions recognized as bilingual documents
pub const DOCUMENT_EXTENSIONS: [&str; 2] = ["xlf", "xliff"];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Whether `path` has a bilingual document extension
    pub fn is_document<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy();
                DOCUMENT_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false)
    }

    /// Find bilingual documents under `path`
    ///
    /// A file is returned as is (when it has a document extension). A directory
    /// is walked recursively. Results are sorted for a stable processing order.
    pub fn find_documents<P: AsRef<Path>>(path: P) -> Result<Vec<PathBuf>> {
        let path = path.as_ref();

        if path.is_file() {
            return Ok(if Self::is_document(path) { vec![path.to_path_buf()] } else { Vec::new() });
        }

        let mut result = Vec::new();
        for entry in WalkDir::new(path).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let entry_path = entry.path();

            if entry_path.is_file() && Self::is_document(entry_path) {
                result.push(entry_path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    /// Where the translated copy of `input_file` is written
    ///
    /// Without an output directory the input is rewritten in place. With one,
    /// the path relative to `input_root` is preserved under it.
    pub fn output_path(input_file: &Path, input_root: &Path, output_dir: Option<&Path>) -> PathBuf {
        let Some(output_dir) = output_dir else {
            return input_file.to_path_buf();
        };

        let relative = input_file
            .strip_prefix(input_root)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .or_else(|| input_file.file_name().map(PathBuf::from))
            .unwrap_or_else(|| input_file.to_path_buf());

        output_dir.join(relative)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }
}
