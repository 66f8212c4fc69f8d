use crate::error::AppError;
use crate::settings::MergeStats;

/// Events sent from background threads to the main UI thread
#[derive(Debug)]
pub enum AppEvent {
    /// Progress line from the preflight checker thread
    PreflightProgress(String),
    /// Preflight check finished (true = all required tools available)
    PreflightComplete(bool),
    /// Free-text log line from the merge worker
    Log(String),
    /// A source file was processed (filename, running count)
    FileProcessed { name: String, count: usize },
    /// Merge run finished
    MergeComplete(Result<MergeStats, AppError>),
}
