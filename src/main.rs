//! # tenant-sql
//!
//! T-SQL object reference extraction and tenant qualifier rendering.
//!
//! Stored scripts use one canonical qualifier (`om.om_*` by default). Each
//! tenant owns its own schema and object prefix; `normalize` folds tenant
//! qualifiers into the canonical form and `render` expands them again for one
//! customer.
//!
//! # Quick Start
//!
//! ```bash
//! # Objects referenced by a script
//! tenant-sql refs report.sql
//!
//! # Syntax check, exit code 1 on failure
//! tenant-sql validate report.sql
//!
//! # Canonicalize a tenant script
//! tenant-sql --mappings tenants.toml normalize tenant_report.sql
//!
//! # Render for one customer
//! tenant-sql --mappings tenants.toml render report.sql --customer ABC
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded from (in order of precedence):
//!
//! 1. Command-line arguments
//! 2. Environment variables (`TENANT_SQL_MAPPINGS`, `RUST_LOG`, etc.)
//! 3. `.tenant-sql.toml` in current directory
//! 4. `~/.config/tenant-sql/config.toml`
//!
//! # Exit Codes
//!
//! - `0` - Success
//! - `1` - Invalid script, unknown customer or any other error

use std::process;

use clap::Parser;
use tokio::main;
use tracing::debug;

use tenant_sql::{
    app::{
        build_renderer, create_output_options, effective_mappings_path, run_normalize,
        run_refs, run_render, run_validate
    },
    cli::{Cli, Commands},
    config::Config,
    error::AppResult,
    logging::init_logging
};

#[main]
async fn main() {
    match run().await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

async fn run() -> AppResult<i32> {
    let cli = Cli::parse();
    let config = Config::load()?;
    init_logging(&config.logging, cli.verbose);

    let opts = create_output_options(cli.output_format, cli.no_color);
    let mappings = effective_mappings_path(cli.mappings, &config);
    debug!(mappings = ?mappings, "configuration loaded");

    let result = match cli.command {
        Commands::Refs {
            files
        } => run_refs(&files, &opts)?,
        Commands::Validate {
            file
        } => run_validate(&file, &opts)?,
        Commands::Normalize {
            file
        } => {
            let renderer = build_renderer(&config, mappings);
            run_normalize(&file, &renderer, &opts).await?
        }
        Commands::Render {
            file,
            customer
        } => {
            let renderer = build_renderer(&config, mappings);
            run_render(&file, &customer, &renderer, &opts).await?
        }
    };

    print!("{}", result.output);
    if !result.output.is_empty() && !result.output.ends_with('\n') {
        println!();
    }
    Ok(result.exit_code)
}
