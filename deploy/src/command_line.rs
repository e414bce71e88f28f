use std::{io, path::PathBuf};

use anyhow::{bail, Result};
use clap::Parser;

use crate::{
    commands,
    config::{Config, FailurePolicy, Network},
    runner::Runner,
};

/// Runs a Hardhat deployment task once per target network, each inside a pseudo-terminal.
#[derive(Debug, Parser)]
pub struct CommandLine {
    /// JSON config file; missing fields fall back to the built-in defaults
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Target network, repeatable; `default` omits the --network flag
    #[clap(short, long = "network")]
    networks: Vec<Network>,

    #[clap(short, long)]
    task: Option<String>,

    #[clap(long)]
    tool: Option<String>,

    /// Abort the run at the first failed deployment
    #[clap(long)]
    stop_on_error: bool,

    /// Print the commands without running them
    #[clap(long)]
    dry_run: bool,
}

impl CommandLine {
    pub fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if !self.networks.is_empty() {
            config.networks = self.networks.clone();
        }
        if let Some(task) = &self.task {
            config.task = task.clone();
        }
        if let Some(tool) = &self.tool {
            config.tool = tool.clone();
        }
        if self.stop_on_error {
            config.on_failure = FailurePolicy::Stop;
        }
        config.validate()?;
        Ok(config)
    }

    pub async fn execute(self) -> Result<()> {
        let config = self.config()?;
        let commands = commands::build(&config);

        if self.dry_run {
            for command in &commands {
                println!("{}", command);
            }
            return Ok(());
        }

        let mut stdout = io::stdout().lock();
        let summary = Runner::from_config(&config)
            .run_all(&commands, &mut stdout)
            .await?;

        if config.on_failure == FailurePolicy::Stop && summary.has_failures() {
            let failed: Vec<_> = summary.failures().map(|o| o.command.as_str()).collect();
            bail!("deployment stopped after failure: {}", failed.join(", "));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_means_defaults() {
        let cmd = CommandLine::try_parse_from(["multichain-deploy"]).unwrap();
        assert_eq!(cmd.config().unwrap(), Config::default());
    }

    #[test]
    fn flags_override_defaults() {
        let cmd = CommandLine::try_parse_from([
            "multichain-deploy",
            "-n",
            "default",
            "--network",
            "polygonMumbai",
            "--task",
            "deploy-terrain",
            "--stop-on-error",
        ])
        .unwrap();
        let config = cmd.config().unwrap();
        assert_eq!(
            config.networks,
            vec![Network::Default, Network::named("polygonMumbai")]
        );
        assert_eq!(config.task, "deploy-terrain");
        assert_eq!(config.tool, "npx hardhat");
        assert_eq!(config.on_failure, FailurePolicy::Stop);
    }

    #[test]
    fn invalid_network_is_rejected() {
        assert!(CommandLine::try_parse_from(["multichain-deploy", "-n", "a;b"]).is_err());
    }

    #[test]
    fn flags_override_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            r#"{ "tool": "pnpm hardhat", "networks": ["avalancheFuji"] }"#,
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let cmd =
            CommandLine::try_parse_from(["multichain-deploy", "-c", path, "-n", "ethereumSepolia"])
                .unwrap();
        let config = cmd.config().unwrap();
        assert_eq!(config.tool, "pnpm hardhat");
        assert_eq!(config.networks, vec![Network::named("ethereumSepolia")]);
    }

    #[tokio::test]
    async fn continue_policy_exits_cleanly() {
        let cmd = CommandLine::try_parse_from([
            "multichain-deploy",
            "--tool",
            "false",
            "-n",
            "default",
        ])
        .unwrap();
        cmd.execute().await.unwrap();
    }

    #[tokio::test]
    async fn stop_policy_reports_failure() {
        let cmd = CommandLine::try_parse_from([
            "multichain-deploy",
            "--tool",
            "false",
            "-n",
            "default",
            "--stop-on-error",
        ])
        .unwrap();
        let err = cmd.execute().await.unwrap_err();
        assert!(err.to_string().contains("false deploy-programmable-token-transfers"));
    }
}
