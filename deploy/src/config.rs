use std::{fmt, fs, path::Path, str::FromStr};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SHELL: &str = "/bin/sh";
pub const DEFAULT_TOOL: &str = "npx hardhat";
pub const DEFAULT_TASK: &str = "deploy-programmable-token-transfers";

const DEFAULT_NETWORK_NAME: &str = "default";

/// A deployment target. `Default` leaves the `--network` flag off so the
/// tool picks its own default network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Network {
    Default,
    Named(String),
}

impl Network {
    pub fn named(name: &str) -> Self {
        Network::Named(name.to_string())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == DEFAULT_NETWORK_NAME {
            return Ok(Network::Default);
        }
        if s.is_empty() {
            return Err("network name is empty".to_string());
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(format!("invalid character {c:?} in network name {s:?}"));
        }
        Ok(Network::Named(s.to_string()))
    }
}

impl TryFrom<String> for Network {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Network> for String {
    fn from(network: Network) -> Self {
        network.to_string()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Default => f.write_str(DEFAULT_NETWORK_NAME),
            Network::Named(name) => f.write_str(name),
        }
    }
}

/// What the runner does after a command exits non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    #[default]
    Continue,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub shell: String,
    pub tool: String,
    pub task: String,
    pub networks: Vec<Network>,
    pub on_failure: FailurePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
            tool: DEFAULT_TOOL.to_string(),
            task: DEFAULT_TASK.to_string(),
            // polygonMumbai is left out: its RPC endpoint kept failing.
            networks: vec![
                Network::Default,
                Network::named("avalancheFuji"),
                Network::named("ethereumSepolia"),
            ],
            on_failure: FailurePolicy::Continue,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.shell.trim().is_empty(), "shell is empty");
        ensure!(!self.tool.trim().is_empty(), "tool is empty");
        ensure!(!self.task.trim().is_empty(), "task is empty");
        ensure!(
            !self.task.chars().any(char::is_whitespace),
            "task {:?} contains whitespace",
            self.task
        );
        Ok(())
    }
}
