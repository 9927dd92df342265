use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// tenant-sql - T-SQL reference extraction and tenant qualifier rendering
#[derive(Parser, Debug)]
#[command(name = "tenant-sql")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Tenant mapping file (TOML, JSON or YAML)
    #[arg(long, global = true, env = "TENANT_SQL_MAPPINGS")]
    pub mappings: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
    pub output_format: Format,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the database objects referenced by SQL scripts
    Refs {
        /// SQL script files (use - for stdin)
        #[arg(required = true)]
        files: Vec<PathBuf>
    },
    /// Check that a SQL script parses
    Validate {
        /// SQL script file (use - for stdin)
        file: PathBuf
    },
    /// Rewrite tenant qualifiers into the canonical form
    Normalize {
        /// SQL script file (use - for stdin)
        file: PathBuf
    },
    /// Rewrite canonical qualifiers for one customer
    Render {
        /// SQL script file (use - for stdin)
        file: PathBuf,

        /// Customer code of the target tenant
        #[arg(short, long)]
        customer: String
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Format {
    Text,
    Json,
    Yaml
}
