//! relgraph Command-Line Client
//!
//! Prints the GraphQL SDL generated for a relational schema, or runs a
//! GraphQL document against a JSON fixture with the in-memory executor.

mod formatter;

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use formatter::OutputFormat;
use relgraph_core::{
    Dialect, DocumentRequest, Engine, EngineConfig, MemoryExecutor, SchemaDocument,
};
use serde_json::{Map, Value as Json};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// relgraph Command-Line Client
#[derive(Parser, Debug)]
#[command(name = "relgraph")]
#[command(version, about = "Generate and run a GraphQL API over a relational schema")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the generated GraphQL SDL
    Sdl {
        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Execute a GraphQL document against a JSON fixture
    Exec {
        #[command(flatten)]
        engine: EngineArgs,

        /// Fixture file mapping table names to row arrays
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// File holding the GraphQL document
        #[arg(short = 'f', long, conflicts_with = "query")]
        file: Option<PathBuf>,

        /// GraphQL document text
        #[arg(short, long)]
        query: Option<String>,

        /// JSON object with variable values
        #[arg(long)]
        variables: Option<String>,

        /// Operation to run when the document holds several
        #[arg(long)]
        operation_name: Option<String>,

        /// Output format
        #[arg(long, default_value = "json", value_enum)]
        format: OutputFormat,
    },
}

/// Options shared by every subcommand that builds an engine.
#[derive(ClapArgs, Debug)]
pub struct EngineArgs {
    /// Schema document (JSON)
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Engine configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Dialect preset deciding the mutation response shape
    #[arg(long)]
    pub dialect: Option<Dialect>,

    /// Maximum relation hops in select types
    #[arg(long, conflicts_with = "no_depth_limit")]
    pub depth_limit: Option<usize>,

    /// Follow relations until a cycle is reached
    #[arg(long)]
    pub no_depth_limit: bool,
}

impl EngineArgs {
    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        if let Some(dialect) = self.dialect {
            config = config.with_mutation_response(dialect.mutation_response());
        }
        if self.no_depth_limit {
            config = config.with_relations_depth_limit(None);
        } else if let Some(limit) = self.depth_limit {
            config = config.with_relations_depth_limit(Some(limit));
        }
        Ok(config)
    }

    fn build_engine(&self) -> Result<Engine> {
        let schema = SchemaDocument::load(&self.schema)?
            .into_schema()
            .with_context(|| format!("invalid schema in {}", self.schema.display()))?;
        let config = self.engine_config()?;
        debug!(?config, "engine configuration");
        Ok(Engine::new(schema, config)?)
    }
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout stays a clean response
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("relgraph=warn".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

/// Run a command. Returns `false` when the response carried errors.
async fn run(args: Args) -> Result<bool> {
    match args.command {
        Command::Sdl { engine } => {
            let engine = engine.build_engine()?;
            print!("{}", engine.sdl());
            Ok(true)
        }
        Command::Exec {
            engine,
            data,
            file,
            query,
            variables,
            operation_name,
            format,
        } => {
            let engine = engine.build_engine()?;
            let executor = MemoryExecutor::new(engine.schema().clone());
            if let Some(path) = &data {
                let fixture = read_json(path)?;
                let rows = executor
                    .load_json(&fixture)
                    .with_context(|| format!("failed to load {}", path.display()))?;
                info!(rows, "fixture loaded");
            }

            let document = match (file, query) {
                (Some(path), _) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                (None, Some(text)) => text,
                (None, None) => bail!("either --query or --file is required"),
            };

            let mut request = DocumentRequest::new(document);
            if let Some(text) = variables {
                request = request.with_variables(parse_variables(&text)?);
            }
            if let Some(name) = operation_name {
                request = request.with_operation_name(name);
            }

            let response = engine.execute_document(&executor, &request).await;
            println!("{}", formatter::format_response(format, &response));
            Ok(response.get("errors").is_none())
        }
    }
}

fn read_json(path: &Path) -> Result<Json> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn parse_variables(text: &str) -> Result<Map<String, Json>> {
    match serde_json::from_str(text).context("invalid --variables")? {
        Json::Object(map) => Ok(map),
        Json::Null => Ok(Map::new()),
        other => bail!("--variables must be a JSON object, found {}", other),
    }
}
