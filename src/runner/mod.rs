//! External command execution and operator confirmations.

use crate::error::{CliError, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

/// Captured result of an external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status was zero
    pub success: bool,
    /// Exit code, if the process exited normally
    pub code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

/// Runs shell command lines such as `npm install`
pub trait CommandRunner {
    /// Run `command` in `cwd`. A non-zero exit is reported in the output,
    /// not as an error; only failing to start the command is an error.
    fn run(&self, command: &str, cwd: &Path) -> impl Future<Output = Result<CommandOutput>>;
}

/// Asks the operator yes/no questions
pub trait UserInput {
    /// Ask `question`; `true` means yes
    fn confirm(&self, question: &str) -> impl Future<Output = Result<bool>>;
}

/// Runs commands through the platform shell
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    shell: PathBuf,
}

impl ProcessRunner {
    /// Locate the platform shell on `PATH`
    pub fn new() -> Result<Self> {
        let name = if cfg!(windows) { "cmd" } else { "sh" };
        let shell = which::which(name).map_err(|e| CliError::ExecutionFailed {
            command: name.to_string(),
            reason: format!("shell not found: {e}"),
        })?;
        Ok(Self { shell })
    }
}

impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput> {
        log::info!("Running '{command}' in {}", cwd.display());
        let flag = if cfg!(windows) { "/C" } else { "-c" };
        let output = Command::new(&self.shell)
            .arg(flag)
            .arg(command)
            .current_dir(cwd)
            .output()
            .await
            .map_err(|e| CliError::ExecutionFailed {
                command: command.to_string(),
                reason: e.to_string(),
            })?;

        let result = CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !result.success {
            log::warn!(
                "'{command}' exited with {:?}: {}",
                result.code,
                result.stderr.trim()
            );
        }
        Ok(result)
    }
}

/// Reads `y`/`n` answers from the terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalInput;

impl UserInput for TerminalInput {
    async fn confirm(&self, question: &str) -> Result<bool> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(format!("{question} [y/N] ").as_bytes()).await?;
        stdout.flush().await?;

        let mut line = String::new();
        BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
        Ok(parse_answer(&line))
    }
}

/// Answers "no" to every question
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractive;

impl UserInput for NonInteractive {
    async fn confirm(&self, question: &str) -> Result<bool> {
        log::debug!("Non-interactive, answering no: {question}");
        Ok(false)
    }
}

/// Terminal or non-interactive input, chosen at startup
#[derive(Debug, Clone, Copy)]
pub enum OperatorInput {
    /// Ask on the terminal
    Terminal(TerminalInput),
    /// Never ask
    NonInteractive(NonInteractive),
}

impl OperatorInput {
    /// Input for the given interactivity
    pub fn new(interactive: bool) -> Self {
        if interactive {
            OperatorInput::Terminal(TerminalInput)
        } else {
            OperatorInput::NonInteractive(NonInteractive)
        }
    }
}

impl UserInput for OperatorInput {
    async fn confirm(&self, question: &str) -> Result<bool> {
        match self {
            OperatorInput::Terminal(input) => input.confirm(question).await,
            OperatorInput::NonInteractive(input) => input.confirm(question).await,
        }
    }
}

fn parse_answer(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
