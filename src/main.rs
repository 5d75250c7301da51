// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::error;

use inkwell::auth::{is_user_readable_only, Roster};
use inkwell::cli::Cli;
use inkwell::logging;
use inkwell::server::Server;
use inkwell::transport::ensure_world_writable_dir;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(cli.debug);

    if let Err(err) = is_user_readable_only(&cli.roles) {
        error!(?err, "refusing to start");
        return ExitCode::FAILURE;
    }

    let listen_dir = cli.listen_dir.unwrap_or_else(|| PathBuf::from("."));
    if let Err(err) = ensure_world_writable_dir(&listen_dir) {
        error!(?err, "refusing to start");
        return ExitCode::FAILURE;
    }

    let server = Server {
        listen_dir,
        roster: Roster::new(cli.roles),
        broadcast_interval: Duration::from_secs(cli.broadcast_interval),
    };

    match server.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(?err, "server exited with an error");
            ExitCode::FAILURE
        }
    }
}
