use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use log::{debug, warn};

use crate::constants::MERGEABLE_EXTENSIONS;
use crate::error::{AppError, Result};

/// Enumerates the source files for a merge run: a single file input yields
/// itself, a folder input is walked and filtered to mergeable extensions.
pub struct SourceCollector {
    input: PathBuf,
}

impl SourceCollector {
    pub fn new(input: PathBuf) -> Result<Self> {
        // Validate the input exists and is readable up front
        if !input.exists() {
            return Err(AppError::InvalidInput(format!(
                "Input path does not exist: {:?}",
                input
            )));
        }

        if input.is_dir() {
            if let Err(e) = fs::read_dir(&input) {
                return Err(AppError::PermissionsError {
                    path: input.clone(),
                    details: format!("Cannot read directory: {}", e),
                });
            }
        }

        Ok(SourceCollector { input })
    }

    /// Ordered list of source files. `recursive` controls whether subfolders
    /// of a folder input are walked; the walk never follows symlinks.
    pub fn collect(&self, recursive: bool) -> Result<Vec<PathBuf>> {
        if self.input.is_file() {
            return Ok(vec![self.input.clone()]);
        }

        debug!("Collecting sources under {:?} (recursive: {})", self.input, recursive);

        let mut builder = WalkBuilder::new(&self.input);
        builder
            .standard_filters(true)
            .hidden(true)
            .follow_links(false);
        if !recursive {
            // Depth 1 keeps the immediate children only
            builder.max_depth(Some(1));
        }

        let mut sources = Vec::new();
        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let path = entry.path();
                    let is_file = entry.file_type().map(|ft| ft.is_file()).unwrap_or(false);
                    if is_file && is_mergeable(path) {
                        sources.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    warn!("Error walking input folder: {}", e);
                }
            }
        }

        // Sort for deterministic merge order
        sources.sort();
        debug!("Collected {} source files", sources.len());
        Ok(sources)
    }
}

fn is_mergeable(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            MERGEABLE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::write(path, b"content").unwrap();
    }

    #[test]
    fn missing_input_is_rejected() {
        let dir = tempdir().unwrap();
        let result = SourceCollector::new(dir.path().join("absent.txt"));
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn single_file_input_yields_itself() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("report.csv");
        touch(&file);

        let collector = SourceCollector::new(file.clone()).unwrap();
        assert_eq!(collector.collect(true).unwrap(), vec![file]);
    }

    #[test]
    fn folder_walk_filters_and_sorts() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("b.txt"));
        touch(&dir.path().join("a.csv"));
        touch(&dir.path().join("image.png")); // not mergeable

        let collector = SourceCollector::new(dir.path().to_path_buf()).unwrap();
        let sources = collector.collect(true).unwrap();
        assert_eq!(
            sources,
            vec![dir.path().join("a.csv"), dir.path().join("b.txt")]
        );
    }

    #[test]
    fn recursive_flag_controls_subfolder_walk() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("top.txt"));
        fs::create_dir(dir.path().join("sub")).unwrap();
        touch(&dir.path().join("sub").join("nested.txt"));

        let collector = SourceCollector::new(dir.path().to_path_buf()).unwrap();

        let flat = collector.collect(false).unwrap();
        assert_eq!(flat, vec![dir.path().join("top.txt")]);

        let deep = collector.collect(true).unwrap();
        assert_eq!(
            deep,
            vec![
                dir.path().join("sub").join("nested.txt"),
                dir.path().join("top.txt"),
            ]
        );
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(is_mergeable(Path::new("NOTES.TXT")));
        assert!(is_mergeable(Path::new("data.Json")));
        assert!(!is_mergeable(Path::new("archive.zip")));
        assert!(!is_mergeable(Path::new("no_extension")));
    }
}
