use std::path::{Path, PathBuf};

use crate::constants::{OutputFormat, DEFAULT_OUTPUT_FILENAME};

/// Options for a single merge run, built from UI state when the user clicks
/// Start and immutable from then on.
#[derive(Debug, Clone)]
pub struct MergeSettings {
    /// Prefix each merged section with its source path
    pub add_source_info: bool,
    /// Walk subfolders of a folder input
    pub recursive: bool,
    /// Combine all sources into a single worksheet (always true from the UI)
    pub combine_sheets: bool,
    pub output_format: OutputFormat,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            add_source_info: true,
            recursive: true,
            combine_sheets: true,
            output_format: OutputFormat::Excel,
        }
    }
}

/// Result summary of a completed merge run.
#[derive(Debug, Clone)]
pub struct MergeStats {
    pub elapsed_secs: f64,
    pub files_processed: usize,
    pub files_succeeded: usize,
    pub output_path: PathBuf,
}

/// Default output path for a freshly selected input: the product's default
/// result filename placed next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    dir.join(DEFAULT_OUTPUT_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_lands_next_to_input() {
        let out = default_output_path(Path::new("/data/reports/report.csv"));
        assert_eq!(out, PathBuf::from("/data/reports/合并结果.xlsx"));
    }

    #[test]
    fn default_output_for_bare_filename() {
        let out = default_output_path(Path::new("report.csv"));
        assert_eq!(out, PathBuf::from("合并结果.xlsx"));
    }

    #[test]
    fn default_settings_mirror_the_form_defaults() {
        let settings = MergeSettings::default();
        assert!(settings.add_source_info);
        assert!(settings.recursive);
        assert!(settings.combine_sheets);
        assert_eq!(settings.output_format, OutputFormat::Excel);
    }
}
