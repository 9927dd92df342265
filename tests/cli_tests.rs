use std::{io::Write, path::PathBuf};

use clap::Parser;
use tempfile::NamedTempFile;
use tenant_sql::{
    app::{
        ConfiguredStore, build_renderer, convert_format, create_output_options,
        effective_mappings_path, read_sql_input, run_normalize, run_refs, run_render,
        run_validate
    },
    cli::{Cli, Commands, Format},
    config::Config,
    output::OutputFormat
};

fn sql_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

#[test]
fn test_parse_refs_command() {
    let cli = Cli::try_parse_from(["tenant-sql", "refs", "a.sql", "b.sql", "--no-color"]).unwrap();
    assert!(cli.no_color);
    match cli.command {
        Commands::Refs {
            files
        } => assert_eq!(files.len(), 2),
        other => panic!("unexpected command: {other:?}")
    }
}

#[test]
fn test_refs_requires_files() {
    assert!(Cli::try_parse_from(["tenant-sql", "refs"]).is_err());
}

#[test]
fn test_parse_render_command() {
    let cli = Cli::try_parse_from([
        "tenant-sql",
        "-f",
        "yaml",
        "render",
        "q.sql",
        "--customer",
        "ABC"
    ])
    .unwrap();
    assert!(matches!(cli.output_format, Format::Yaml));
    match cli.command {
        Commands::Render {
            file,
            customer
        } => {
            assert_eq!(file, PathBuf::from("q.sql"));
            assert_eq!(customer, "ABC");
        }
        other => panic!("unexpected command: {other:?}")
    }
}

#[test]
fn test_unknown_format_is_rejected() {
    assert!(Cli::try_parse_from(["tenant-sql", "-f", "sarif", "validate", "q.sql"]).is_err());
}

#[test]
fn test_convert_format() {
    assert_eq!(convert_format(Format::Text), OutputFormat::Text);
    assert_eq!(convert_format(Format::Json), OutputFormat::Json);
    assert_eq!(convert_format(Format::Yaml), OutputFormat::Yaml);
}

#[test]
fn test_create_output_options() {
    let opts = create_output_options(Format::Json, true);
    assert_eq!(opts.format, OutputFormat::Json);
    assert!(!opts.colored);
}

#[test]
fn test_flag_overrides_configured_mappings() {
    let mut config = Config::default();
    config.mappings.path = Some(PathBuf::from("config.toml"));

    assert_eq!(
        effective_mappings_path(Some(PathBuf::from("flag.toml")), &config),
        Some(PathBuf::from("flag.toml"))
    );
    assert_eq!(
        effective_mappings_path(None, &config),
        Some(PathBuf::from("config.toml"))
    );
}

#[test]
fn test_configured_store_without_path_is_empty() {
    assert!(matches!(
        ConfiguredStore::from_path(None),
        ConfiguredStore::Memory(_)
    ));
    assert!(matches!(
        ConfiguredStore::from_path(Some(PathBuf::from("t.toml"))),
        ConfiguredStore::File(_)
    ));
}

#[test]
fn test_read_sql_input_missing_file() {
    assert!(read_sql_input(&PathBuf::from("/nonexistent/q.sql")).is_err());
}

#[test]
fn test_run_validate_exit_codes() {
    let opts = create_output_options(Format::Text, true);
    let good = sql_file("SELECT 1");
    let bad = sql_file("SELECT * FROM t WHERE )");

    assert_eq!(run_validate(good.path(), &opts).unwrap().exit_code, 0);
    let result = run_validate(bad.path(), &opts).unwrap();
    assert_eq!(result.exit_code, 1);
    assert!(result.output.contains(":1:23:"));
}

#[test]
fn test_run_refs_yaml() {
    let opts = create_output_options(Format::Yaml, true);
    let file = sql_file("SELECT * FROM om.om_orders");

    let result = run_refs(&[file.path().to_path_buf()], &opts).unwrap();
    assert_eq!(result.exit_code, 0);
    assert!(result.output.contains("name: om.om_orders"));
    assert!(result.output.contains("kind: Table"));
}

#[test]
fn test_run_refs_parse_failure_is_error() {
    let opts = create_output_options(Format::Text, true);
    let file = sql_file("SELECT FROM");
    assert!(run_refs(&[file.path().to_path_buf()], &opts).is_err());
}

#[tokio::test]
async fn test_run_normalize_without_mappings() {
    let opts = create_output_options(Format::Text, true);
    let renderer = build_renderer(&Config::default(), None);
    let file = sql_file("SELECT * FROM abc.abc_t");

    let result = run_normalize(file.path(), &renderer, &opts).await.unwrap();
    assert_eq!(result.output, "SELECT * FROM abc.abc_t");
}

#[tokio::test]
async fn test_run_render_unknown_customer() {
    let opts = create_output_options(Format::Text, true);
    let renderer = build_renderer(&Config::default(), None);
    let file = sql_file("SELECT * FROM om.om_t");

    assert!(run_render(file.path(), "ABC", &renderer, &opts).await.is_err());
}
