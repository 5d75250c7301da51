// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory to bind client FIFOs in. Defaults to the current directory.
    #[arg(long)]
    pub listen_dir: Option<PathBuf>,

    /// Path to the role file (`<username> <role>` per line).
    #[arg(long)]
    pub roles: PathBuf,

    /// Seconds between periodic broadcasts to connected clients. 0 disables broadcasting.
    #[arg(long, default_value_t = 5)]
    pub broadcast_interval: u64,

    /// Enable debug-level logging.
    #[arg(long)]
    pub debug: bool,
}

#[test]
fn verify() {
    use clap::CommandFactory as _;
    Cli::command().debug_assert();
}
