use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Jenkins token. Default is the token stored under "jenkinsdevtoken" in the secret store
    #[clap(long, value_parser, env = "JENKINS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Jenkins and Jira username. Default is the local user
    #[clap(long, value_parser)]
    pub user: Option<String>,

    /// Configuration file path. Default is mergeissue.conf next to the install directory
    #[clap(long, value_parser, env = "MERGEISSUE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Git branch to build. Default is the current branch
    #[clap(long, value_parser)]
    pub branch: Option<String>,

    /// Extra build parameter, may be repeated
    #[clap(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Skip TLS certificate verification
    #[clap(long, value_parser, default_value_t = false)]
    pub insecure: bool,

    /// Print the requests instead of sending them
    #[clap(short, long, value_parser, default_value_t = false)]
    pub dry_run: bool,

    /// Show debug logs
    #[clap(short, long, value_parser, default_value_t = false)]
    pub verbose: bool,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", raw))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in {:?}", raw));
    }

    Ok((key.to_string(), value.to_string()))
}
