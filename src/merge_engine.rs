use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Instant;

use log::{debug, warn};
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::constants::OutputFormat;
use crate::error::{AppError, Result};
use crate::office_writer::{self, DocBlock};
use crate::settings::{MergeSettings, MergeStats};
use crate::source_collector::SourceCollector;

/// Receives log lines and per-file progress from a running engine.
pub trait EngineSink {
    fn log(&self, line: String);
    fn file_processed(&self, name: &str, count: usize);
}

/// The merge collaborator contract: combine everything under `input` into a
/// single document at `output`.
pub trait MergeEngine {
    fn merge_files(
        &self,
        input: &Path,
        output: &Path,
        settings: &MergeSettings,
        sink: &dyn EngineSink,
    ) -> Result<MergeStats>;
}

/// One successfully read source file.
struct Section {
    path: PathBuf,
    content: String,
}

#[derive(Serialize)]
struct JsonRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    content: serde_json::Value,
}

/// Built-in engine: reads text-like sources and renders the merged document
/// in the chosen output format.
#[derive(Default)]
pub struct BuiltinEngine;

impl MergeEngine for BuiltinEngine {
    fn merge_files(
        &self,
        input: &Path,
        output: &Path,
        settings: &MergeSettings,
        sink: &dyn EngineSink,
    ) -> Result<MergeStats> {
        let started = Instant::now();

        let collector = SourceCollector::new(input.to_path_buf())?;
        let sources: Vec<PathBuf> = collector
            .collect(settings.recursive)?
            .into_iter()
            .filter(|path| path != output) // never merge the output into itself
            .collect();

        if sources.is_empty() {
            return Err(AppError::NoMergeableFiles(input.to_path_buf()));
        }

        let mut sections = Vec::new();
        let mut files_processed = 0;

        for path in &sources {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            sink.log(format!("Processing: {}", name));

            files_processed += 1;
            match read_source(path) {
                Ok(content) => sections.push(Section {
                    path: path.clone(),
                    content,
                }),
                Err(e) => {
                    warn!("Skipping unreadable source {:?}: {}", path, e);
                    sink.log(format!("Skipped {}: {}", name, e));
                }
            }
            sink.file_processed(&name, files_processed);
        }

        let files_succeeded = sections.len();
        if files_succeeded == 0 {
            return Err(AppError::MergeFailed(
                "none of the source files could be read".to_string(),
            ));
        }

        let bytes = render(&sections, settings)?;
        atomic_write(output, &bytes)?;

        Ok(MergeStats {
            elapsed_secs: started.elapsed().as_secs_f64(),
            files_processed,
            files_succeeded,
            output_path: output.to_path_buf(),
        })
    }
}

fn render(sections: &[Section], settings: &MergeSettings) -> Result<Vec<u8>> {
    match settings.output_format {
        OutputFormat::Text => Ok(render_text(sections, settings.add_source_info).into_bytes()),
        OutputFormat::Json => render_json(sections, settings.add_source_info),
        OutputFormat::Excel => {
            office_writer::build_xlsx(&spreadsheet_rows(sections, settings.add_source_info))
        }
        OutputFormat::Word => office_writer::build_docx(&document_blocks(sections, settings.add_source_info)),
    }
}

fn render_text(sections: &[Section], add_source_info: bool) -> String {
    let mut parts = Vec::with_capacity(sections.len());
    for section in sections {
        if add_source_info {
            parts.push(format!(
                "===== {} =====\n{}",
                section.path.display(),
                section.content
            ));
        } else {
            parts.push(section.content.clone());
        }
    }
    parts.join("\n\n")
}

fn render_json(sections: &[Section], add_source_info: bool) -> Result<Vec<u8>> {
    let records: Vec<JsonRecord> = sections
        .iter()
        .map(|section| JsonRecord {
            source: add_source_info.then(|| section.path.display().to_string()),
            content: json_content(section),
        })
        .collect();
    Ok(serde_json::to_vec_pretty(&records)?)
}

/// JSON sources contribute their parsed value; everything else contributes a
/// plain string.
fn json_content(section: &Section) -> serde_json::Value {
    let is_json = section
        .path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        if let Ok(value) = serde_json::from_str(&section.content) {
            return value;
        }
        warn!("Source {:?} is not valid JSON, embedding as string", section.path);
    }
    serde_json::Value::String(section.content.clone())
}

fn spreadsheet_rows(sections: &[Section], add_source_info: bool) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for section in sections {
        let source = section.path.display().to_string();
        for line in section.content.lines() {
            if add_source_info {
                rows.push(vec![source.clone(), line.to_string()]);
            } else {
                rows.push(vec![line.to_string()]);
            }
        }
    }
    rows
}

fn document_blocks(sections: &[Section], add_source_info: bool) -> Vec<DocBlock> {
    let mut blocks = Vec::new();
    for section in sections {
        if add_source_info {
            blocks.push(DocBlock::Heading(section.path.display().to_string()));
        }
        for line in section.content.lines() {
            blocks.push(DocBlock::Paragraph(line.to_string()));
        }
    }
    blocks
}

/// Reads a source file as UTF-8. Non-UTF-8 content falls back to a GBK
/// conversion via the `iconv` helper tool, then to lossy conversion.
fn read_source(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| {
        AppError::new_io_error(e, Some(path.to_path_buf()), "Failed to read file".to_string())
    })?;

    match String::from_utf8(bytes) {
        Ok(content) => Ok(content),
        Err(e) => {
            let bytes = e.into_bytes();
            if let Some(converted) = convert_with_iconv(&bytes) {
                debug!("Converted {:?} from GBK via iconv", path);
                return Ok(converted);
            }
            warn!("File {:?} contains non-UTF8 content, using lossy conversion", path);
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}

fn convert_with_iconv(bytes: &[u8]) -> Option<String> {
    let mut child = Command::new("iconv")
        .args(["-f", "GBK", "-t", "UTF-8"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;

    // Feed stdin from its own thread so a large input cannot deadlock
    // against the child's stdout pipe.
    let mut stdin = child.stdin.take()?;
    let input = bytes.to_vec();
    let feeder = thread::spawn(move || {
        let _ = stdin.write_all(&input);
    });

    let output = child.wait_with_output().ok()?;
    let _ = feeder.join();
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok()
}

/// Writes the merged document through a temp file in the destination
/// directory so a failed run never leaves a half-written output.
pub fn atomic_write(output_path: &Path, bytes: &[u8]) -> Result<()> {
    let parent_dir = output_path.parent().ok_or_else(|| AppError::AtomicWriteError {
        path: output_path.to_path_buf(),
        details: "Could not get parent directory for temp file.".to_string(),
    })?;
    let parent_dir = if parent_dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent_dir
    };

    let mut temp_file = NamedTempFile::new_in(parent_dir).map_err(|e| {
        AppError::new_io_error(e, None, "Failed to create temp file for atomic write.".to_string())
    })?;

    temp_file.write_all(bytes).map_err(|e| {
        AppError::new_io_error(
            e,
            Some(temp_file.path().to_path_buf()),
            "Failed to write to temp file.".to_string(),
        )
    })?;

    temp_file.persist(output_path).map_err(|e| AppError::AtomicWriteError {
        path: output_path.to_path_buf(),
        details: format!("Failed to persist temp file to target path: {}", e.error),
    })?;

    debug!("Successfully wrote merged document to {:?}", output_path);
    Ok(())
}
