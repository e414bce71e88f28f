use crate::config::{Config, Network};

pub fn deploy_command(tool: &str, task: &str, network: &Network) -> String {
    match network {
        Network::Default => format!("{tool} {task}"),
        Network::Named(name) => format!("{tool} {task} --network {name}"),
    }
}

/// One deployment command per configured network, in configuration order.
pub fn build(config: &Config) -> Vec<String> {
    config
        .networks
        .iter()
        .map(|network| deploy_command(&config.tool, &config.task, network))
        .collect()
}

pub fn default_commands() -> Vec<String> {
    build(&Config::default())
}
