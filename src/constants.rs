use std::time::Duration;

pub const UI_STATUS_MESSAGE_DURATION: Duration = Duration::from_secs(5);

/// Crude per-file progress heuristic: each processed file advances the bar
/// by this many percent, capped at 100.
pub const PROGRESS_PERCENT_PER_FILE: u32 = 10;

/// Default output filename auto-filled next to the chosen input
/// ("merge result" in the product's original locale).
pub const DEFAULT_OUTPUT_FILENAME: &str = "合并结果.xlsx";

/// Extensions considered mergeable when walking an input folder.
pub const MERGEABLE_EXTENSIONS: &[&str] = &["txt", "csv", "json", "md", "log"];

/// External helper tools verified by the startup preflight check.
/// `iconv` backs the GBK fallback for non-UTF-8 source files.
pub const REQUIRED_TOOLS: &[&str] = &["iconv"];

// Output Formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Excel,
    Word,
    Json,
    Text,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Excel,
        OutputFormat::Word,
        OutputFormat::Json,
        OutputFormat::Text,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Excel => "xlsx",
            OutputFormat::Word => "docx",
            OutputFormat::Json => "json",
            OutputFormat::Text => "txt",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Excel => "Excel",
            OutputFormat::Word => "Word",
            OutputFormat::Json => "JSON",
            OutputFormat::Text => "Text",
        }
    }

    pub fn label(&self) -> String {
        format!("{} (.{})", self.name(), self.extension())
    }

    /// Resolve a format from a combo-box label. Excel wins first, then Word,
    /// then JSON; anything else falls back to plain text.
    pub fn from_label(label: &str) -> OutputFormat {
        if label.contains("Excel") {
            OutputFormat::Excel
        } else if label.contains("Word") {
            OutputFormat::Word
        } else if label.contains("JSON") {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub const DEFAULT_OUTPUT_FORMAT: OutputFormat = OutputFormat::Excel;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_resolution_matches_by_substring() {
        assert_eq!(OutputFormat::from_label("Excel (.xlsx)"), OutputFormat::Excel);
        assert_eq!(OutputFormat::from_label("Word (.docx)"), OutputFormat::Word);
        assert_eq!(OutputFormat::from_label("JSON (.json)"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_label("Text (.txt)"), OutputFormat::Text);
    }

    #[test]
    fn unknown_label_falls_back_to_text() {
        assert_eq!(OutputFormat::from_label("Spreadsheet"), OutputFormat::Text);
        assert_eq!(OutputFormat::from_label(""), OutputFormat::Text);
    }

    #[test]
    fn round_trip_through_label() {
        for format in OutputFormat::ALL {
            assert_eq!(OutputFormat::from_label(&format.label()), format);
        }
    }
}
