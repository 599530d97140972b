/*
 * main.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! qhbs - expand Handlebars-style templates from the command line

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "qhbs")]
#[command(version)]
#[command(about = "Expand Handlebars-style templates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand a template and print the result
    Render {
        /// Template file
        template: PathBuf,

        /// JSON file with additional context
        #[arg(short = 'c', long)]
        context: Option<PathBuf>,

        /// JSON file with the session user
        #[arg(long)]
        user: Option<PathBuf>,

        /// Asset root (defaults to the template's directory)
        #[arg(long)]
        assets: Option<PathBuf>,

        /// Engine configuration (YAML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Component library to load before rendering (asset path)
        #[arg(long = "components", value_name = "ASSET")]
        components: Vec<String>,

        /// Request cookie (NAME=VALUE)
        #[arg(long, value_name = "NAME=VALUE")]
        cookie: Vec<String>,

        /// Request header (NAME:VALUE)
        #[arg(long = "header", short = 'H', value_name = "NAME:VALUE")]
        headers: Vec<String>,

        /// Request protocol
        #[arg(long, default_value = "http")]
        protocol: String,

        /// Request host name
        #[arg(long, default_value = "localhost")]
        host: String,

        /// Request path
        #[arg(long, default_value = "/")]
        path: String,

        /// Request locale
        #[arg(long)]
        locale: Option<String>,
    },

    /// Load a component library and print its definitions as JSON
    Components {
        /// Asset path of the library (relative to the asset root)
        asset: String,

        /// Asset root (defaults to the current directory)
        #[arg(long)]
        assets: Option<PathBuf>,

        /// Engine configuration (YAML)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quarto_handlebars=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            template,
            context,
            user,
            assets,
            config,
            components,
            cookie,
            headers,
            protocol,
            host,
            path,
            locale,
        } => commands::render::execute(commands::render::RenderArgs {
            template,
            context,
            user,
            assets,
            config,
            components,
            cookies: cookie,
            headers,
            protocol,
            host,
            path,
            locale,
        }),
        Commands::Components {
            asset,
            assets,
            config,
        } => commands::components::execute(commands::components::ComponentsArgs {
            asset,
            assets,
            config,
        }),
    }
}
