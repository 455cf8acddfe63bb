// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use clap::Parser;
use roam_cli::Cli;

fn main() {
    let cli = Cli::parse();
    roam_cli::setup_logging(cli.verbose);
    if let Err(e) = roam_cli::run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
