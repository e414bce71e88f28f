use std::{io::Write, process::ExitStatus};

use anyhow::{ensure, Result};

use crate::{
    config::{Config, FailurePolicy},
    pty::Pty,
};

#[derive(Debug)]
pub struct Outcome {
    pub command: String,
    pub status: ExitStatus,
    pub output: Vec<u8>,
}

impl Outcome {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Captured output as text, with the terminal's `\r\n` turned back into `\n`.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).replace("\r\n", "\n")
    }
}

#[derive(Debug, Default)]
pub struct Summary {
    pub outcomes: Vec<Outcome>,
    pub skipped: Vec<String>,
}

impl Summary {
    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|outcome| !outcome.success())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

pub struct Runner {
    shell: String,
    policy: FailurePolicy,
}

impl Runner {
    pub fn new(shell: &str, policy: FailurePolicy) -> Self {
        Self {
            shell: shell.to_string(),
            policy,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.shell, config.on_failure)
    }

    /// Runs one command inside a fresh pseudo-terminal and reports it to `out`.
    /// A non-zero exit is reported and returned as an [`Outcome`], not as an error.
    pub async fn run<W: Write>(&self, command: &str, out: &mut W) -> Result<Outcome> {
        ensure!(!command.trim().is_empty(), "refusing to run an empty command");

        log::info!("running `{}`", command);
        writeln!(out, "Running command: {command}")?;

        let captured = Pty::open()?
            .spawn_and_capture(&self.shell, command)
            .await?;
        let outcome = Outcome {
            command: command.to_string(),
            status: captured.status,
            output: captured.output,
        };

        if outcome.success() {
            writeln!(out, "Output:\n{}", outcome.text())?;
            writeln!(out, "result: {}", outcome.status)?;
        } else {
            log::warn!("`{}` failed: {}", command, outcome.status);
            writeln!(out, "Error running command: '{command}':\n{}", outcome.text())?;
            writeln!(out, "Command '{command}' failed: {}", outcome.status)?;
        }
        out.flush()?;

        Ok(outcome)
    }

    pub async fn run_all<W: Write>(&self, commands: &[String], out: &mut W) -> Result<Summary> {
        let mut summary = Summary::default();

        for (index, command) in commands.iter().enumerate() {
            let outcome = self.run(command, out).await?;
            let failed = !outcome.success();
            summary.outcomes.push(outcome);

            if failed && self.policy == FailurePolicy::Stop {
                summary.skipped = commands[index + 1..].to_vec();
                break;
            }
        }

        let failed = summary.failures().count();
        log::info!(
            "{} commands run, {} failed, {} skipped",
            summary.outcomes.len(),
            failed,
            summary.skipped.len()
        );
        writeln!(
            out,
            "Finished: {} succeeded, {} failed, {} skipped",
            summary.outcomes.len() - failed,
            failed,
            summary.skipped.len()
        )?;

        Ok(summary)
    }
}
