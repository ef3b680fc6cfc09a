use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use plexus_coercion::CoercionPolicy;
use plexus_config::PortMapping;
use plexus_runtime::{Plan, Runtime, RuntimeConfig};
use serde_json::{Map, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod builtin;
mod plan_file;

use plan_file::PlanFile;

/// Plexus - a graph execution engine for async components
#[derive(Parser)]
#[command(name = "plexus")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Treat every mapping that cannot coerce as an error
  #[arg(long, global = true)]
  strict: bool,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Build a plan and print its effective wiring
  Validate {
    /// Path to the plan file (JSON)
    plan_file: PathBuf,
  },

  /// Run a plan with a JSON payload read from stdin
  Run {
    /// Path to the plan file (JSON)
    plan_file: PathBuf,

    /// Maximum number of components running at once
    #[arg(long)]
    max_concurrency: Option<usize>,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("plexus=info,warn")),
    )
    .with_writer(io::stderr)
    .with_target(false)
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Validate { plan_file }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(validate(plan_file, cli.strict))?;
    }
    Some(Commands::Run {
      plan_file,
      max_concurrency,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run(plan_file, cli.strict, max_concurrency))?;
    }
    None => {
      println!("plexus - use --help to see available commands");
    }
  }

  Ok(())
}

async fn load(plan_file: PathBuf, strict: bool) -> Result<(PlanFile, RuntimeConfig)> {
  let file = PlanFile::load(&plan_file).await?;
  info!(
    path = %plan_file.display(),
    components = file.components.len(),
    strict,
    "plan_file_loaded"
  );
  let mut config = file.runtime.clone();
  if strict {
    config.coercion_policy = CoercionPolicy::strict();
  }
  Ok((file, config))
}

async fn validate(plan_file: PathBuf, strict: bool) -> Result<()> {
  let (file, config) = load(plan_file, strict).await?;
  let registry = file.registry();

  let runtime = Runtime::new(file.plan, registry, config).context("plan validation failed")?;
  print_summary(runtime.plan());

  Ok(())
}

async fn run(plan_file: PathBuf, strict: bool, max_concurrency: Option<usize>) -> Result<()> {
  let (file, mut config) = load(plan_file, strict).await?;
  if let Some(max_concurrency) = max_concurrency {
    config.max_concurrency = max_concurrency;
  }
  let registry = file.registry();

  let mut runtime =
    Runtime::new(file.plan, registry, config).context("plan validation failed")?;

  let payload = read_payload_from_stdin()?;
  let result = runtime.run(payload).await.context("plan execution failed")?;

  eprintln!("Execution completed: {}", result.execution_id);
  println!("{}", serde_json::to_string_pretty(&result)?);

  Ok(())
}

fn print_summary(plan: &Plan) {
  let name = if plan.name().is_empty() {
    "<unnamed>"
  } else {
    plan.name()
  };
  println!("Plan: {name}");
  println!("Start nodes: {}", plan.start_nodes().join(", "));
  println!("Terminal nodes: {}", plan.terminal_nodes().join(", "));

  let synthesized = plan.synthesized_mappings();
  println!("Mappings:");
  for mapping in plan.mappings() {
    let marker = if synthesized.contains(mapping) {
      " (implicit)"
    } else {
      ""
    };
    println!("  {}{marker}", describe(mapping));
  }

  println!("Expressions:");
  for expression in plan.expressions() {
    println!(
      "  {}.{} <- {}",
      expression.target_id,
      expression.target_field,
      serde_json::to_string(&expression.expression).unwrap_or_default()
    );
  }
}

fn describe(mapping: &PortMapping) -> String {
  format!(
    "{}.{} -> {}.{}",
    mapping.source_id, mapping.source_port, mapping.target_id, mapping.target_port
  )
}

fn read_payload_from_stdin() -> Result<Map<String, Value>> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    return Ok(Map::new());
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read payload from stdin")?;

  if input.trim().is_empty() {
    return Ok(Map::new());
  }

  let payload: Value =
    serde_json::from_str(&input).context("failed to parse payload JSON from stdin")?;
  match payload {
    Value::Object(payload) => Ok(payload),
    other => bail!("payload must be a JSON object, got: {other}"),
  }
}
