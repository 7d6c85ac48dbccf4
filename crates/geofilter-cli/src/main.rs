// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use geofilter_config::{load_config, CliOverrides, LogFormat, LogLevel, LoggingConfig};
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "geofilter", version, about, long_about = None)]
struct Args {
	/// Path to custom configuration file
	#[arg(short, long, env = "GEOFILTER_CONFIG")]
	config: Option<PathBuf>,

	/// Log level (error, warn, info, debug, trace)
	#[arg(short, long)]
	log_level: Option<String>,

	/// Map projection code used for CRS-aware services, e.g. EPSG:25832
	#[arg(long)]
	projection: Option<String>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Map a CRS code to its OGC URI
	Crs { code: String },
	/// Show the default operator for a snippet type
	Operator {
		snippet_type: String,
		/// The attribute stores delimiter-joined values
		#[arg(long)]
		delimiter: bool,
	},
	/// Resolve the service descriptor of a layer
	Resolve {
		/// services.json style catalog
		#[arg(long)]
		catalog: PathBuf,
		/// Layer model as JSON, e.g. '{"id":"123","sourceId":"456"}'
		#[arg(long)]
		layer: String,
		/// The service lives outside the hosting deployment
		#[arg(long = "extern")]
		external: bool,
	},
	/// Harvest the value domain of a SensorThings service
	Harvest {
		/// Service root, e.g. https://iot.example.org/v1.1
		url: String,
		#[arg(long, default_value = "Things")]
		root: String,
	},
	/// Fetch additional filter geometries for catalog layers
	Geometries {
		#[arg(long)]
		catalog: PathBuf,
		#[arg(required = true)]
		layer_ids: Vec<String>,
	},
}

impl From<&Args> for CliOverrides {
	fn from(args: &Args) -> Self {
		CliOverrides {
			log_level: args.log_level.clone(),
			map_projection: args.projection.clone(),
		}
	}
}

fn log_level_to_tracing(level: LogLevel) -> tracing::Level {
	match level {
		LogLevel::Trace => tracing::Level::TRACE,
		LogLevel::Debug => tracing::Level::DEBUG,
		LogLevel::Info => tracing::Level::INFO,
		LogLevel::Warn => tracing::Level::WARN,
		LogLevel::Error => tracing::Level::ERROR,
	}
}

// Logs go to stderr; stdout carries the JSON result.
fn init_tracing(logging: &LoggingConfig) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		let level = log_level_to_tracing(logging.level);
		EnvFilter::new(format!(
			"geofilter={level},geofilter_core={level},geofilter_http={level},geofilter_config={level},geofilter_engine={level}"
		))
	});

	match logging.format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Compact => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().compact().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().with_writer(std::io::stderr))
				.init();
		}
	}
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config = load_config(args.config.clone(), CliOverrides::from(&args))
		.context("failed to load configuration")?;

	init_tracing(&config.logging);
	debug!(command = ?args.command, "starting geofilter");

	let output = match args.command {
		Command::Crs { code } => commands::crs(&code),
		Command::Operator {
			snippet_type,
			delimiter,
		} => commands::operator(&snippet_type, delimiter),
		Command::Resolve {
			catalog,
			layer,
			external,
		} => commands::resolve(&config, &catalog, &layer, external)?,
		Command::Harvest { url, root } => commands::harvest(&config, &url, &root).await?,
		Command::Geometries { catalog, layer_ids } => {
			commands::geometries(&config, &catalog, &layer_ids).await?
		}
	};

	println!("{}", serde_json::to_string_pretty(&output)?);
	Ok(())
}
