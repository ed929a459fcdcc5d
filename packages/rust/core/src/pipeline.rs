//! Concurrent per-file pipeline: format → (optional) instructions → emit/save.
//!
//! Files without instructions are formatted and emitted inline, in order.
//! Files with instructions run as separate tasks; a shared semaphore caps how
//! many are inside the instruction stage at once. No state is shared between
//! file tasks besides that semaphore, and no ordering is imposed on output.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use mdcc_markdown::FormatOptions;
use mdcc_shared::{MdccError, Result};

use crate::instructions::{InstructionRunner, apply_all};
use crate::sink::OutputSink;
use crate::template;

/// A set of files sharing the same formatting and instruction settings.
#[derive(Debug, Clone, Default)]
pub struct FileGroup {
    /// Files in discovery order.
    pub files: Vec<PathBuf>,
    /// Line selection and rendering options.
    pub format: FormatOptions,
    /// Instructions applied to each formatted block, in order.
    pub instructions: Vec<String>,
    /// Output path template; each file's final block is written there.
    pub save_output: Option<String>,
    /// Requested concurrency; 0 defers to the machine.
    pub threads: usize,
}

/// A file whose instructions or save step failed.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: MdccError,
}

/// Outcome of a pipeline run.
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// Files whose block was emitted (read errors rendered inline count here).
    pub files_processed: usize,
    pub failures: Vec<FileFailure>,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, path: &Path, outcome: Result<()>) {
        match outcome {
            Ok(()) => self.files_processed += 1,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "file failed");
                self.failures.push(FileFailure {
                    path: path.to_path_buf(),
                    error,
                });
            }
        }
    }
}

/// Largest positive thread request across groups, else available parallelism.
pub fn parallelism(groups: &[FileGroup]) -> usize {
    groups
        .iter()
        .map(|g| g.threads)
        .max()
        .filter(|&threads| threads > 0)
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        })
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Runs file groups through formatting and instructions.
pub struct Pipeline {
    runner: Arc<dyn InstructionRunner>,
    sink: Arc<dyn OutputSink>,
    permits: Arc<Semaphore>,
}

impl Pipeline {
    pub fn new(
        parallelism: usize,
        runner: Arc<dyn InstructionRunner>,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            runner,
            sink,
            permits: Arc::new(Semaphore::new(parallelism.max(1))),
        }
    }

    /// Process every file of every group and wait for all tasks.
    ///
    /// A failing file never stops the others.
    #[instrument(skip_all, fields(groups = groups.len()))]
    pub async fn run(&self, groups: Vec<FileGroup>) -> PipelineReport {
        let mut report = PipelineReport::default();
        let mut handles = Vec::new();

        for group in groups {
            let group = Arc::new(group);
            info!(
                files = group.files.len(),
                instructions = group.instructions.len(),
                "processing group"
            );

            for path in &group.files {
                if group.instructions.is_empty() {
                    let outcome = process_plain(path, &group, self.sink.as_ref());
                    report.record(path, outcome);
                    continue;
                }

                let path = path.clone();
                let group = Arc::clone(&group);
                let runner = Arc::clone(&self.runner);
                let sink = Arc::clone(&self.sink);
                let permits = Arc::clone(&self.permits);

                let task_path = path.clone();
                let handle = tokio::spawn(async move {
                    process_with_instructions(
                        &task_path,
                        &group,
                        runner.as_ref(),
                        sink.as_ref(),
                        &permits,
                    )
                    .await
                });
                handles.push((path, handle));
            }
        }

        for (path, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(MdccError::Instruction(format!("file task aborted: {e}"))),
            };
            report.record(&path, outcome);
        }

        info!(
            processed = report.files_processed,
            failed = report.failures.len(),
            "pipeline complete"
        );
        report
    }
}

/// Format, emit, and save a file synchronously.
fn process_plain(path: &Path, group: &FileGroup, sink: &dyn OutputSink) -> Result<()> {
    sink.status(&format!("Processing: {} ...", path.display()));
    let content = mdcc_markdown::format_file(path, &group.format);
    let outcome = emit_and_save(path, &content, group.save_output.as_deref(), sink);
    sink.clear_status();
    outcome
}

/// Format, then transform under a permit, then emit and save.
async fn process_with_instructions(
    path: &Path,
    group: &FileGroup,
    runner: &dyn InstructionRunner,
    sink: &dyn OutputSink,
    permits: &Semaphore,
) -> Result<()> {
    let formatted = {
        let path = path.to_path_buf();
        let format = group.format.clone();
        tokio::task::spawn_blocking(move || mdcc_markdown::format_file(&path, &format))
            .await
            .map_err(|e| MdccError::Instruction(format!("format task failed: {e}")))?
    };

    let transformed = {
        let _permit = permits
            .acquire()
            .await
            .map_err(|_| MdccError::Instruction("instruction permits closed".into()))?;
        sink.status(&format!("Processing: {} ...", path.display()));
        debug!(path = %path.display(), "permit acquired");
        apply_all(runner, &group.instructions, formatted).await
    };

    let outcome = match transformed {
        Ok(content) => emit_and_save(path, &content, group.save_output.as_deref(), sink),
        Err(e) => Err(e),
    };
    sink.clear_status();
    outcome
}

fn emit_and_save(
    path: &Path,
    content: &str,
    save_output: Option<&str>,
    sink: &dyn OutputSink,
) -> Result<()> {
    sink.emit(content);

    let Some(template) = save_output.filter(|t| !t.trim().is_empty()) else {
        return Ok(());
    };

    let target = template::resolve(template, path)?;
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| MdccError::io(parent, e))?;
    }
    std::fs::write(&target, content).map_err(|e| MdccError::io(&target, e))?;

    sink.status(&format!("Saving to: {} ... Done!", target.display()));
    sink.saved(&target);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::sink::RecordingSink;

    /// Uppercases text; tracks peak concurrency; fails on text containing "REJECT_ME".
    #[derive(Default)]
    struct Upper {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl InstructionRunner for Upper {
        async fn apply(&self, _instruction: &str, text: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if text.contains("REJECT_ME") {
                return Err(MdccError::Instruction("transform rejected".into()));
            }
            Ok(text.to_uppercase())
        }
    }

    fn write_files(dir: &Path, contents: &[(&str, &str)]) -> Vec<PathBuf> {
        contents
            .iter()
            .map(|(name, body)| {
                let path = dir.join(name);
                std::fs::write(&path, body).unwrap();
                path
            })
            .collect()
    }

    #[tokio::test]
    async fn plain_files_emit_in_order_without_runner_calls() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_files(dir.path(), &[("a.txt", "one"), ("b.txt", "two")]);

        let runner = Arc::new(Upper::default());
        let sink = Arc::new(RecordingSink::new());
        let pipeline = Pipeline::new(1, runner.clone(), sink.clone());

        let report = pipeline
            .run(vec![FileGroup {
                files,
                ..Default::default()
            }])
            .await;

        assert!(report.is_success());
        assert_eq!(report.files_processed, 2);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
        let blocks = sink.blocks();
        assert!(blocks[0].ends_with("```\none\n```\n"));
        assert!(blocks[1].ends_with("```\ntwo\n```\n"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn permits_bound_instruction_concurrency() {
        let dir = tempfile::tempdir().unwrap();
        let names: Vec<(String, String)> = (0..8)
            .map(|i| (format!("f{i}.txt"), format!("body {i}")))
            .collect();
        let refs: Vec<(&str, &str)> = names
            .iter()
            .map(|(n, b)| (n.as_str(), b.as_str()))
            .collect();
        let files = write_files(dir.path(), &refs);

        let runner = Arc::new(Upper::default());
        let sink = Arc::new(RecordingSink::new());
        let pipeline = Pipeline::new(2, runner.clone(), sink.clone());

        let report = pipeline
            .run(vec![FileGroup {
                files,
                instructions: vec!["shout".into()],
                ..Default::default()
            }])
            .await;

        assert_eq!(report.files_processed, 8);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 8);
        assert!(runner.peak.load(Ordering::SeqCst) <= 2);
        assert!(sink.blocks().iter().all(|b| b.contains("BODY")));
    }

    #[tokio::test]
    async fn one_failing_transform_does_not_stop_others() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_files(
            dir.path(),
            &[("ok1.txt", "fine"), ("bad.txt", "REJECT_ME here"), ("ok2.txt", "fine too")],
        );
        let bad = files[1].clone();

        let sink = Arc::new(RecordingSink::new());
        let pipeline = Pipeline::new(3, Arc::new(Upper::default()), sink.clone());

        let report = pipeline
            .run(vec![FileGroup {
                files,
                instructions: vec!["shout".into()],
                ..Default::default()
            }])
            .await;

        assert_eq!(report.files_processed, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, bad);
        assert_eq!(sink.blocks().len(), 2);
    }

    #[tokio::test]
    async fn failed_transform_releases_its_permit() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_files(
            dir.path(),
            &[("bad.txt", "REJECT_ME first"), ("ok1.txt", "fine"), ("ok2.txt", "fine too")],
        );

        let runner = Arc::new(Upper::default());
        let sink = Arc::new(RecordingSink::new());
        let pipeline = Pipeline::new(1, runner.clone(), sink.clone());

        let report = tokio::time::timeout(
            Duration::from_secs(10),
            pipeline.run(vec![FileGroup {
                files,
                instructions: vec!["shout".into()],
                ..Default::default()
            }]),
        )
        .await
        .expect("pipeline stalled on a held permit");

        assert_eq!(report.files_processed, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 3);
        assert_eq!(runner.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreadable_file_with_instructions_reaches_runner() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.txt");

        let sink = Arc::new(RecordingSink::new());
        let pipeline = Pipeline::new(1, Arc::new(Upper::default()), sink.clone());

        let report = pipeline
            .run(vec![FileGroup {
                files: vec![missing],
                instructions: vec!["shout".into()],
                ..Default::default()
            }])
            .await;

        assert!(report.is_success());
        assert!(sink.blocks()[0].contains("ERROR READING FILE"));
    }

    #[tokio::test]
    async fn unreadable_file_is_rendered_not_failed() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.txt");

        let sink = Arc::new(RecordingSink::new());
        let pipeline = Pipeline::new(1, Arc::new(Upper::default()), sink.clone());

        let report = pipeline
            .run(vec![FileGroup {
                files: vec![missing],
                ..Default::default()
            }])
            .await;

        assert!(report.is_success());
        assert!(sink.blocks()[0].contains("Error reading file"));
    }

    #[tokio::test]
    async fn saves_final_content_to_template_path() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_files(dir.path(), &[("notes.txt", "hello")]);
        let template = format!("{}/out/{{fileBase}}.md", dir.path().display());

        let sink = Arc::new(RecordingSink::new());
        let pipeline = Pipeline::new(1, Arc::new(Upper::default()), sink.clone());

        let report = pipeline
            .run(vec![FileGroup {
                files,
                instructions: vec!["shout".into()],
                save_output: Some(template),
                ..Default::default()
            }])
            .await;

        assert!(report.is_success());
        let saved = dir.path().join("out").join("notes.md");
        assert_eq!(sink.saved_paths(), vec![saved.clone()]);
        let written = std::fs::read_to_string(saved).unwrap();
        assert!(written.contains("HELLO"));
        assert_eq!(written, sink.blocks()[0]);
    }

    #[test]
    fn parallelism_prefers_largest_request() {
        let groups = vec![
            FileGroup {
                threads: 0,
                ..Default::default()
            },
            FileGroup {
                threads: 3,
                ..Default::default()
            },
        ];
        assert_eq!(parallelism(&groups), 3);
    }

    #[test]
    fn parallelism_defaults_to_machine() {
        let groups = vec![FileGroup::default()];
        assert!(parallelism(&groups) >= 1);
        assert!(parallelism(&[]) >= 1);
    }
}
