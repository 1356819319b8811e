// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Multi-cluster Kubernetes tool server binary.

use clap::{Parser, Subcommand};

mod call;
mod logging;
mod version;

#[derive(Parser, Debug)]
#[command(
	name = "kmcp-server",
	about = "Multi-cluster Kubernetes tools for agents",
	version
)]
struct Args {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version and build information
	Version,
	/// Invoke a single tool and print its result
	Call(call::CallArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	let call_args = match args.command {
		Command::Version => {
			println!("{}", version::format_version_info());
			return Ok(());
		}
		Command::Call(call_args) => call_args,
	};

	let config = call_args.load_config()?;
	logging::init(&config.logging);

	tracing::info!(
		federation_enabled = config.federation.enabled,
		credential_mode = %config.federation.credential_mode,
		"starting kmcp-server"
	);

	let result = call::run(&call_args, &config).await?;
	println!("{}", result.text);
	if result.is_error {
		std::process::exit(1);
	}
	Ok(())
}
