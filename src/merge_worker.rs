use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use log::error;

use crate::error::AppError;
use crate::events::AppEvent;
use crate::merge_engine::{EngineSink, MergeEngine};
use crate::settings::MergeSettings;

/// Forwards engine output over the app event channel.
struct ChannelSink {
    sender: mpsc::Sender<AppEvent>,
}

impl EngineSink for ChannelSink {
    fn log(&self, line: String) {
        if let Err(e) = self.sender.send(AppEvent::Log(line)) {
            error!("Failed to send log line: {}", e);
        }
    }

    fn file_processed(&self, name: &str, count: usize) {
        let event = AppEvent::FileProcessed {
            name: name.to_string(),
            count,
        };
        if let Err(e) = self.sender.send(event) {
            error!("Failed to send progress event: {}", e);
        }
    }
}

/// Handle to the one transient background thread a merge run owns. The
/// window holds at most one of these at a time and discards it on
/// completion; there is no cancellation.
pub struct MergeWorker {
    handle: thread::JoinHandle<()>,
}

impl MergeWorker {
    pub fn spawn<E>(
        engine: E,
        input: PathBuf,
        output: PathBuf,
        settings: MergeSettings,
        sender: mpsc::Sender<AppEvent>,
    ) -> Self
    where
        E: MergeEngine + Send + 'static,
    {
        let handle = thread::spawn(move || {
            let sink = ChannelSink {
                sender: sender.clone(),
            };
            sink.log("Starting file merge...".to_string());

            // A panicking engine must surface as a failure event, never as a
            // crashed process.
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                engine.merge_files(&input, &output, &settings, &sink)
            }));

            let outcome = match result {
                Ok(Ok(stats)) => {
                    sink.log(format!("Merge succeeded! Output file: {}", output.display()));
                    sink.log(format!(
                        "Elapsed: {:.2}s | Files: {} | Succeeded: {}",
                        stats.elapsed_secs, stats.files_processed, stats.files_succeeded
                    ));
                    Ok(stats)
                }
                Ok(Err(e)) => {
                    sink.log(format!("Merge failed: {}", e));
                    Err(e)
                }
                Err(payload) => {
                    let message = panic_message(payload);
                    sink.log(format!("Error: {}", message));
                    Err(AppError::MergeFailed(message))
                }
            };

            if let Err(e) = sender.send(AppEvent::MergeComplete(outcome)) {
                error!("Failed to send merge result: {}", e);
            }
        });

        Self { handle }
    }

    #[allow(dead_code)]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::new()
    };
    if message.is_empty() {
        "merge worker panicked".to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::OutputFormat;
    use crate::error::Result;
    use crate::merge_engine::BuiltinEngine;
    use crate::settings::MergeStats;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::tempdir;

    struct PanickingEngine;

    impl MergeEngine for PanickingEngine {
        fn merge_files(
            &self,
            _input: &Path,
            _output: &Path,
            _settings: &MergeSettings,
            _sink: &dyn EngineSink,
        ) -> Result<MergeStats> {
            panic!("engine blew up");
        }
    }

    struct FailingEngine;

    impl MergeEngine for FailingEngine {
        fn merge_files(
            &self,
            _input: &Path,
            _output: &Path,
            _settings: &MergeSettings,
            _sink: &dyn EngineSink,
        ) -> Result<MergeStats> {
            Err(AppError::MergeFailed("schema mismatch".to_string()))
        }
    }

    fn drain_until_complete(receiver: &mpsc::Receiver<AppEvent>) -> Vec<AppEvent> {
        let mut events = Vec::new();
        loop {
            let event = receiver
                .recv_timeout(Duration::from_secs(5))
                .expect("worker did not finish in time");
            let is_terminal = matches!(event, AppEvent::MergeComplete(_));
            events.push(event);
            if is_terminal {
                return events;
            }
        }
    }

    #[test]
    fn successful_run_delivers_progress_then_completion() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        fs::write(dir.path().join("b.txt"), "beta").unwrap();
        let output = dir.path().join("merged.txt");

        let (sender, receiver) = mpsc::channel();
        MergeWorker::spawn(
            BuiltinEngine,
            dir.path().to_path_buf(),
            output,
            MergeSettings {
                output_format: OutputFormat::Text,
                ..MergeSettings::default()
            },
            sender,
        );

        let events = drain_until_complete(&receiver);

        // Per-file counts arrive in emission order
        let counts: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                AppEvent::FileProcessed { count, .. } => Some(*count),
                _ => None,
            })
            .collect();
        assert_eq!(counts, vec![1, 2]);

        match events.last() {
            Some(AppEvent::MergeComplete(Ok(stats))) => {
                assert_eq!(stats.files_processed, 2);
                assert!(stats.files_succeeded <= stats.files_processed);
            }
            other => panic!("expected successful completion, got {:?}", other),
        }
    }

    #[test]
    fn engine_error_is_relayed_verbatim() {
        let dir = tempdir().unwrap();
        let (sender, receiver) = mpsc::channel();
        MergeWorker::spawn(
            FailingEngine,
            dir.path().to_path_buf(),
            dir.path().join("out.txt"),
            MergeSettings::default(),
            sender,
        );

        let events = drain_until_complete(&receiver);
        match events.last() {
            Some(AppEvent::MergeComplete(Err(e))) => {
                assert!(e.to_string().contains("schema mismatch"));
            }
            other => panic!("expected failure completion, got {:?}", other),
        }
    }

    #[test]
    fn panicking_engine_becomes_a_failure_event() {
        let dir = tempdir().unwrap();
        let (sender, receiver) = mpsc::channel();
        let worker = MergeWorker::spawn(
            PanickingEngine,
            dir.path().to_path_buf(),
            dir.path().join("out.txt"),
            MergeSettings::default(),
            sender,
        );

        let events = drain_until_complete(&receiver);
        match events.last() {
            Some(AppEvent::MergeComplete(Err(e))) => {
                assert!(!e.to_string().is_empty());
                assert!(e.to_string().contains("engine blew up"));
            }
            other => panic!("expected failure completion, got {:?}", other),
        }

        let _ = worker.handle.join();
    }

    #[test]
    fn panic_message_has_a_fallback() {
        assert_eq!(panic_message(Box::new(42_u32)), "merge worker panicked");
        assert_eq!(panic_message(Box::new("boom")), "boom");
    }
}
