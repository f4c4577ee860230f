use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use resultgraph::results::builders::{collect_fetch_paths, NoExplicitMappings};
use resultgraph::sql::jdbc_metadata::ResultSetMetadata;
use resultgraph::sql::table_group::FromClauseIndex;
use resultgraph::{DomainModel, EngineConfig, ResultSetMapping};

/// Resultgraph - inspect the row-to-object-graph plans built for a domain model
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine configuration file (YAML); environment variables are used otherwise
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the builder tree, selections and FROM clause for an entity root
    Explain {
        /// Domain model file (YAML or JSON)
        #[arg(long)]
        model: PathBuf,

        /// Root entity name
        #[arg(long)]
        entity: String,

        /// Result-set column labels, in order
        #[arg(long, value_delimiter = ',', required = true)]
        columns: Vec<String>,
    },
}

fn load_model(path: &PathBuf) -> anyhow::Result<DomainModel> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(DomainModel::from_json_str(&content)?)
    } else {
        Ok(DomainModel::from_yaml_file(path)?)
    }
}

fn explain(
    config: &EngineConfig,
    model: &PathBuf,
    entity: &str,
    columns: &[String],
) -> anyhow::Result<()> {
    let model = load_model(model)?;
    log::info!(
        "Loaded model '{}' with {} entities",
        model.name(),
        model.entities().count()
    );

    let mapping = ResultSetMapping::for_entity(&model, entity, &NoExplicitMappings, config)?;
    let labels: Vec<&str> = columns.iter().map(String::as_str).collect();
    let metadata = ResultSetMetadata::from_labels(&labels);
    let mut from_clause = FromClauseIndex::new();
    let resolved = mapping.resolve(&metadata, &model, &mut from_clause, config)?;

    let fetch_paths = mapping
        .result_builder()
        .map(collect_fetch_paths)
        .unwrap_or_default();
    let report = serde_json::json!({
        "mapping": mapping,
        "fetch_paths": fetch_paths,
        "selections": resolved.selections,
        "result": resolved.result,
        "from": from_clause.to_sql(),
        "physical_joins": from_clause.physical_join_count(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_yaml_file(path),
        None => EngineConfig::from_env(),
    }
    .context("Configuration error")?;

    match cli.command {
        Command::Explain {
            model,
            entity,
            columns,
        } => explain(&config, &model, &entity, &columns),
    }
}
