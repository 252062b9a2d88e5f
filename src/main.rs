use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use eavquery::config::{self, EngineConfig};
use eavquery::dictionary::{resolve_class, DictionaryConfig, SchemaContext, TenantDomainMapper};
use eavquery::lowering::lower_query;
use eavquery::node::InMemoryNodeResolver;
use eavquery::query_model::Query;
use eavquery::result_set::{ResultCursor, ResultOptions, ResultRow};

/// eavquery - lower query trees into EAV join and predicate commands
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine configuration file (YAML); overrides the flags below
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Read engine configuration from EAVQUERY_* environment variables
    #[arg(long, global = true)]
    from_env: bool,

    /// Batch width for node reference prefetching
    #[arg(long, global = true, default_value_t = 1000)]
    bulk_fetch_size: i32,

    /// Permission evaluation budget
    #[arg(long, global = true, default_value_t = 1000)]
    max_permission_checks: usize,

    /// Store used when a query names none
    #[arg(long, global = true, default_value = "workspace://SpacesStore")]
    default_store: String,

    /// Tenant domain stripped from store identifiers
    #[arg(long, global = true)]
    tenant_domain: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lower a query tree (JSON) against a dictionary (YAML)
    Lower {
        #[arg(long)]
        dictionary: PathBuf,

        /// Query file, or `-` for stdin
        #[arg(long, default_value = "-")]
        query: PathBuf,

        /// Row id to node reference map (YAML or JSON), needed by queries
        /// that name nodes by reference
        #[arg(long)]
        nodes: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Walk a result cursor over row ids, resolving their node references
    ResolveIds {
        /// Row id to node reference map (YAML or JSON)
        #[arg(long)]
        nodes: PathBuf,

        /// Row ids in result order
        #[arg(required = true, value_delimiter = ',')]
        ids: Vec<i64>,

        /// Final result size cap
        #[arg(long)]
        max_items: Option<usize>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show the directory ids a class name resolves to
    ResolveClass {
        #[arg(long)]
        dictionary: PathBuf,

        name: String,

        /// Only the class itself, without sub-classes
        #[arg(long)]
        exact: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

impl From<&Cli> for config::CliConfig {
    fn from(cli: &Cli) -> Self {
        config::CliConfig {
            bulk_fetch_size: cli.bulk_fetch_size,
            max_permission_checks: cli.max_permission_checks,
            default_store: cli.default_store.clone(),
            tenant_domain: cli.tenant_domain.clone(),
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let config = if let Some(path) = &cli.config {
        EngineConfig::from_yaml_file(path)?
    } else if cli.from_env {
        EngineConfig::from_env()?
    } else {
        EngineConfig::from_cli(cli.into())?
    };
    Ok(config)
}

fn read_query(path: &Path, config: &EngineConfig) -> anyhow::Result<Query> {
    let content = if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read query from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read query file {}", path.display()))?
    };

    let mut value: serde_json::Value =
        serde_json::from_str(&content).context("query is not valid JSON")?;
    if let Some(object) = value.as_object_mut() {
        object
            .entry("store")
            .or_insert_with(|| serde_json::Value::String(config.default_store.clone()));
    }
    serde_json::from_value(value).context("query does not match the query tree format")
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    // Initialize logger - defaults to WARN level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = load_config(&cli).context("configuration error")?;
    let tenant = TenantDomainMapper::new(config.tenant_domain.clone());

    match &cli.command {
        Command::Lower {
            dictionary,
            query,
            nodes,
            format,
        } => {
            let (dictionary, directory) = DictionaryConfig::from_yaml_file(dictionary)?.build()?;
            let nodes = nodes
                .as_ref()
                .map(InMemoryNodeResolver::from_yaml_file)
                .transpose()?;
            let mut schema = SchemaContext::new(&dictionary, &directory, &tenant);
            if let Some(nodes) = &nodes {
                schema = schema.with_nodes(nodes);
            }
            let query = read_query(query, &config)?;
            let lowered = lower_query(&query, &schema)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&lowered)?),
                OutputFormat::Text => print!("{}", lowered),
            }
        }
        Command::ResolveClass {
            dictionary,
            name,
            exact,
        } => {
            let (dictionary, directory) = DictionaryConfig::from_yaml_file(dictionary)?.build()?;
            let schema = SchemaContext::new(&dictionary, &directory, &tenant);
            let resolved = resolve_class(&schema, name, *exact)?;
            println!("{} ({:?}): {:?}", resolved.name, resolved.kind, resolved.ids);
        }
        Command::ResolveIds {
            nodes,
            ids,
            max_items,
            format,
        } => {
            let nodes = InMemoryNodeResolver::from_yaml_file(nodes)?;
            let mut options = ResultOptions::default();
            if let Some(max_items) = max_items {
                options = options.with_max_items(*max_items);
            }
            let mut cursor = ResultCursor::new(ids.clone(), &nodes, &tenant, &config, &options);
            let rows = (0..cursor.len())
                .map(|index| cursor.row(index))
                .collect::<Result<Vec<ResultRow>, _>>()?;
            let metadata = cursor.metadata();
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "metadata": metadata,
                        "rows": rows,
                    }))?
                ),
                OutputFormat::Text => {
                    println!(
                        "{} row(s), limited by {:?} (max {})",
                        metadata.length, metadata.limit_by, metadata.max_size
                    );
                    for row in &rows {
                        match row.node_ref() {
                            Some(node) => println!("{}\t{}", row.node_id(), node),
                            None => println!("{}\t(deleted)", row.node_id()),
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
