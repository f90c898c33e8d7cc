//! CLI arguments for the `memswap-solver` binary.

use {
    clap::Parser,
    std::{net::SocketAddr, path::PathBuf},
};

/// Run the solver service.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// The log filter.
    #[arg(long, env, default_value = "warn,solver=debug")]
    pub log: String,

    /// Whether to use JSON format for the logs.
    #[clap(long, env, default_value = "false")]
    pub use_json_logs: bool,

    /// The socket address to bind to.
    #[arg(long, env, default_value = "127.0.0.1:7577")]
    pub addr: SocketAddr,

    /// Path to the TOML configuration file.
    #[clap(long, env)]
    pub config: PathBuf,
}
