//! External instruction transforms.
//!
//! Each instruction rewrites the current text; a list is applied in order,
//! each step feeding the next. [`CommandRunner`] delegates a step to an
//! external program (typically an AI CLI): the text goes to its stdin and
//! its stdout becomes the new text.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use mdcc_shared::{INSTRUCTION_PLACEHOLDER, InstructionsConfig, MdccError, Result};

/// A single text-to-text transform step.
#[async_trait]
pub trait InstructionRunner: Send + Sync {
    /// Apply `instruction` to `text`, returning the replacement text.
    async fn apply(&self, instruction: &str, text: &str) -> Result<String>;
}

/// Apply every instruction in order, short-circuiting on the first failure.
pub async fn apply_all(
    runner: &dyn InstructionRunner,
    instructions: &[String],
    text: String,
) -> Result<String> {
    let mut current = text;
    for (step, instruction) in instructions.iter().enumerate() {
        debug!(step = step + 1, total = instructions.len(), "applying instruction");
        current = runner.apply(instruction, &current).await?;
    }
    Ok(current)
}

// ---------------------------------------------------------------------------
// CommandRunner
// ---------------------------------------------------------------------------

/// Runs each instruction through an external command.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &InstructionsConfig) -> Self {
        Self::new(
            config.command.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Arguments with `{instruction}` substituted.
    fn args_for(&self, instruction: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(INSTRUCTION_PLACEHOLDER, instruction))
            .collect()
    }
}

#[async_trait]
impl InstructionRunner for CommandRunner {
    #[instrument(skip_all, fields(cmd = %self.command))]
    async fn apply(&self, instruction: &str, text: &str) -> Result<String> {
        let mut child = Command::new(&self.command)
            .args(self.args_for(instruction))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                MdccError::Instruction(format!(
                    "failed to spawn `{}`: {e}. Is it installed?",
                    self.command
                ))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| MdccError::Instruction("failed to capture stdin".into()))?;

        // stdin is written from its own task while stdout/stderr drain.
        let input = text.to_string();
        let writer = tokio::spawn(async move {
            if let Err(e) = stdin.write_all(input.as_bytes()).await {
                debug!(error = %e, "instruction command closed stdin early");
            }
        });

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                MdccError::Instruction(format!(
                    "`{}` timed out after {}s",
                    self.command,
                    self.timeout.as_secs_f64()
                ))
            })?
            .map_err(|e| MdccError::Instruction(format!("`{}` failed: {e}", self.command)))?;

        if let Err(e) = writer.await {
            warn!(error = %e, "instruction stdin writer failed");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MdccError::Instruction(format!(
                "`{}` exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        info!(
            in_len = text.len(),
            out_len = output.stdout.len(),
            "instruction applied"
        );
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
