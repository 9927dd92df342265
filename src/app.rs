//! Application logic for the tenant-sql CLI.
//!
//! This module contains the command implementations separated from the main
//! entry point to enable testing.

use std::{
    fs::read_to_string,
    io::{self, Read},
    path::{Path, PathBuf}
};

use tracing::debug;

use crate::{
    cli::Format,
    config::Config,
    error::{AppError, AppResult, SqlError, file_read_error},
    mapping::{FileMappingStore, InMemoryMappingStore, MappingStore, TenantMapping},
    output::{
        OutputFormat, OutputOptions, RewriteOutput, ScriptReferences, ValidationReport,
        format_references, format_rewrite, format_validation
    },
    parser::parse_script,
    refs::extract_many,
    render::ScriptRenderer
};

/// Text printed by a command and the process exit code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub output:    String
}

impl CommandOutput {
    fn success(output: String) -> Self {
        Self {
            exit_code: 0,
            output
        }
    }
}

/// Mapping store selected by configuration
#[derive(Debug, Clone)]
pub enum ConfiguredStore {
    File(FileMappingStore),
    Memory(InMemoryMappingStore)
}

impl ConfiguredStore {
    /// File store when a path is configured, otherwise an empty store
    pub fn from_path(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => Self::File(FileMappingStore::new(path)),
            None => Self::Memory(InMemoryMappingStore::default())
        }
    }
}

impl MappingStore for ConfiguredStore {
    async fn get_all(&self) -> Result<Vec<TenantMapping>, SqlError> {
        match self {
            Self::File(store) => store.get_all().await,
            Self::Memory(store) => store.get_all().await
        }
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<TenantMapping>, SqlError> {
        match self {
            Self::File(store) => store.get_by_code(code).await,
            Self::Memory(store) => store.get_by_code(code).await
        }
    }
}

/// Convert CLI format to internal OutputFormat
pub fn convert_format(format: Format) -> OutputFormat {
    match format {
        Format::Text => OutputFormat::Text,
        Format::Json => OutputFormat::Json,
        Format::Yaml => OutputFormat::Yaml
    }
}

/// Create output options from parameters
pub fn create_output_options(format: Format, no_color: bool) -> OutputOptions {
    OutputOptions {
        format:  convert_format(format),
        colored: !no_color
    }
}

/// CLI flag wins over the configured mapping file
pub fn effective_mappings_path(flag: Option<PathBuf>, config: &Config) -> Option<PathBuf> {
    flag.or_else(|| config.mappings.path.clone())
}

/// Build the renderer for the configured store and canonical qualifier
pub fn build_renderer(
    config: &Config,
    mappings: Option<PathBuf>
) -> ScriptRenderer<ConfiguredStore> {
    ScriptRenderer::with_canonical(
        ConfiguredStore::from_path(mappings),
        config.canonical.qualifier()
    )
}

/// Read SQL from file or stdin
pub fn read_sql_input(path: &Path) -> AppResult<String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| file_read_error("stdin", e))?;
        Ok(buffer)
    } else {
        let display = path.display().to_string();
        read_to_string(path).map_err(|e| file_read_error(&display, e))
    }
}

fn source_name(path: &Path) -> String {
    if path.as_os_str() == "-" {
        String::from("stdin")
    } else {
        path.display().to_string()
    }
}

/// Run the refs command
///
/// Scripts are extracted in parallel; the first script that fails to parse
/// aborts the command with its position.
pub fn run_refs(files: &[PathBuf], opts: &OutputOptions) -> AppResult<CommandOutput> {
    let sources: Vec<String> = files.iter().map(|p| source_name(p)).collect();
    let scripts = files
        .iter()
        .map(|p| read_sql_input(p))
        .collect::<AppResult<Vec<_>>>()?;

    let mut extracted = Vec::with_capacity(scripts.len());
    for (source, result) in sources.iter().zip(extract_many(&scripts)) {
        let refs = result.map_err(|e| {
            debug!(source = %source, "reference extraction failed");
            with_source(source, e)
        })?;
        extracted.push(refs);
    }

    let reports: Vec<ScriptReferences<'_>> = sources
        .iter()
        .zip(&extracted)
        .map(|(source, refs)| ScriptReferences {
            source,
            references: refs
        })
        .collect();
    Ok(CommandOutput::success(format_references(&reports, opts)?))
}

/// Run the validate command; exit code 1 when the script does not parse
pub fn run_validate(file: &Path, opts: &OutputOptions) -> AppResult<CommandOutput> {
    let sql = read_sql_input(file)?;
    let source = source_name(file);
    let (valid, errors) = match parse_script(&sql) {
        Ok(_) => (true, Vec::new()),
        Err(errors) => (false, errors)
    };
    let report = ValidationReport {
        source: &source,
        valid,
        errors: &errors
    };
    Ok(CommandOutput {
        exit_code: if valid { 0 } else { 1 },
        output:    format_validation(&report, opts)?
    })
}

/// Run the normalize command
pub async fn run_normalize<S: MappingStore>(
    file: &Path,
    renderer: &ScriptRenderer<S>,
    opts: &OutputOptions
) -> AppResult<CommandOutput> {
    let sql = read_sql_input(file)?;
    let normalized = renderer
        .normalize_for_storage(&sql)
        .await
        .map_err(|e| with_source(&source_name(file), e))?;
    let output = RewriteOutput {
        customer_code: None,
        sql:           &normalized
    };
    Ok(CommandOutput::success(format_rewrite(&output, opts)?))
}

/// Run the render command
pub async fn run_render<S: MappingStore>(
    file: &Path,
    customer_code: &str,
    renderer: &ScriptRenderer<S>,
    opts: &OutputOptions
) -> AppResult<CommandOutput> {
    let sql = read_sql_input(file)?;
    let rendered = renderer
        .render_for_customer(&sql, customer_code)
        .await
        .map_err(|e| with_source(&source_name(file), e))?;
    let output = RewriteOutput {
        customer_code: Some(customer_code),
        sql:           &rendered
    };
    Ok(CommandOutput::success(format_rewrite(&output, opts)?))
}

/// Prefix parse failures with the script they came from
fn with_source(source: &str, err: SqlError) -> AppError {
    match err {
        SqlError::ParseFailure {
            line,
            column,
            message
        } => AppError::bad_request(format!(
            "{}:{}:{}: {}",
            source, line, column, message
        )),
        other => other.into()
    }
}
