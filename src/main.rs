use std::collections::{BTreeMap, HashMap};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use cobalt_auth::{RequestAuthValue, StaticCredentialProvider};
use cobalt_config::{WorkflowDocument, load_value, load_workflow_document};
use cobalt_engine::{Collaborators, EngineConfig, WorkflowEngine};
use cobalt_http::{ReqwestTransport, TransportConfig};
use cobalt_schema::{ApiDocument, ExtractOptions, extract_operation_io};

/// Cobalt - runs multi-step HTTP workflows described by API documents
#[derive(Parser)]
#[command(name = "cobalt")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Increase log verbosity (-v info, -vv debug, -vvv trace)
  #[arg(short, long, global = true, action = clap::ArgAction::Count)]
  verbose: u8,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a workflow to completion, printing each step result
  Run {
    /// Path to the workflow document (JSON or YAML)
    workflow_file: PathBuf,

    /// The workflow to run
    #[arg(long)]
    workflow: String,

    /// Override a source description: name=path
    #[arg(long = "source", value_parser = parse_source)]
    sources: Vec<(String, PathBuf)>,

    /// Workflow inputs as a JSON object (default: read from stdin)
    #[arg(long)]
    inputs: Option<String>,

    /// Engine, transport and credential settings (JSON or YAML)
    #[arg(long)]
    config: Option<PathBuf>,
  },

  /// Print the flattened inputs and outputs of one operation
  Describe {
    /// Path to the API document (JSON or YAML)
    api_file: PathBuf,

    /// Operation path, e.g. /pets/{petId}
    path: String,

    /// HTTP method
    method: String,

    #[arg(long)]
    input_depth: Option<usize>,

    #[arg(long)]
    output_depth: Option<usize>,
  },
}

/// Settings file for `cobalt run`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RunConfig {
  #[serde(flatten)]
  engine: EngineConfig,
  timeout_secs: Option<u64>,
  user_agent: Option<String>,
  /// Security scheme name to the value sent for it.
  credentials: BTreeMap<String, RequestAuthValue>,
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  match cli.command {
    Some(Commands::Run {
      workflow_file,
      workflow,
      sources,
      inputs,
      config,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_workflow(workflow_file, workflow, sources, inputs, config))?;
    }
    Some(Commands::Describe {
      api_file,
      path,
      method,
      input_depth,
      output_depth,
    }) => {
      describe_operation(&api_file, &path, &method, input_depth, output_depth)?;
    }
    None => {
      println!("cobalt - use --help to see available commands");
    }
  }

  Ok(())
}

/// Logs go to stderr so stdout carries only results. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
  let level = match verbose {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(verbose >= 2)
    .with_line_number(verbose >= 3)
    .with_writer(io::stderr)
    .init();

  debug!(verbose, "logging initialized");
}

async fn run_workflow(
  workflow_file: PathBuf,
  workflow_id: String,
  source_overrides: Vec<(String, PathBuf)>,
  inputs: Option<String>,
  config_file: Option<PathBuf>,
) -> Result<()> {
  let document = load_workflow_document(&workflow_file)
    .with_context(|| format!("failed to load workflow file: {}", workflow_file.display()))?;
  info!(path = %workflow_file.display(), workflows = document.workflows.len(), "loaded workflow document");

  let config: RunConfig = match &config_file {
    Some(path) => load_value(path)
      .with_context(|| format!("failed to load config file: {}", path.display()))?,
    None => RunConfig::default(),
  };

  let base_dir = workflow_file.parent().unwrap_or(Path::new("."));
  let documents = load_sources(&document, base_dir, source_overrides)?;

  let transport = ReqwestTransport::new(TransportConfig {
    timeout: config.timeout_secs.map(Duration::from_secs),
    user_agent: config.user_agent.clone(),
  })
  .context("failed to create HTTP client")?;

  let credentials = config
    .credentials
    .into_iter()
    .fold(StaticCredentialProvider::new(), |provider, (scheme, value)| {
      provider.with_scheme(scheme, value)
    });

  let collaborators = Collaborators {
    documents: Arc::new(documents),
    transport: Arc::new(transport),
    credentials: Arc::new(credentials),
  };
  let engine = WorkflowEngine::new(document, collaborators, config.engine)
    .context("failed to create workflow engine")?;

  let inputs = match inputs {
    Some(text) => serde_json::from_str(&text).context("failed to parse --inputs JSON")?,
    None => read_payload_from_stdin()?,
  };
  let serde_json::Value::Object(inputs) = inputs else {
    bail!("workflow inputs must be a JSON object");
  };

  let execution_id = engine.start_workflow(&workflow_id, inputs)?;
  eprintln!("Started execution: {}", execution_id);

  let cancel = CancellationToken::new();
  {
    let cancel = cancel.clone();
    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        cancel.cancel();
      }
    });
  }

  drive_execution(&engine, &execution_id, &cancel).await
}

/// Step a run until it is terminal, printing each result. Cancellation drops
/// the in-flight step along with its request; the run keeps its last
/// non-terminal status.
async fn drive_execution(
  engine: &WorkflowEngine,
  execution_id: &str,
  cancel: &CancellationToken,
) -> Result<()> {
  loop {
    let result = tokio::select! {
      _ = cancel.cancelled() => {
        warn!(execution_id = %execution_id, "interrupted, run left unfinished");
        bail!("execution {} interrupted", execution_id);
      }
      result = engine.execute_next_step(execution_id) => result.context("step execution failed")?,
    };
    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.is_terminal() {
      eprintln!("Execution finished: {}", result.status);
      return Ok(());
    }
  }
}

/// Load every source description the workflow names. Relative paths are
/// taken from the workflow file's directory.
fn load_sources(
  document: &WorkflowDocument,
  base_dir: &Path,
  overrides: Vec<(String, PathBuf)>,
) -> Result<HashMap<String, ApiDocument>> {
  let mut paths: BTreeMap<String, PathBuf> = overrides.into_iter().collect();

  for source in &document.source_descriptions {
    if paths.contains_key(&source.name) {
      continue;
    }
    if source.url.starts_with("http://") || source.url.starts_with("https://") {
      bail!(
        "source '{}' is remote ({}); download it and pass --source {}=<path>",
        source.name,
        source.url,
        source.name
      );
    }
    paths.insert(source.name.clone(), base_dir.join(&source.url));
  }

  let mut documents = HashMap::new();
  for (name, path) in paths {
    let api: ApiDocument = load_value(&path)
      .with_context(|| format!("failed to load source '{}': {}", name, path.display()))?;
    debug!(source = %name, path = %path.display(), "loaded API document");
    documents.insert(name, api);
  }
  Ok(documents)
}

fn describe_operation(
  api_file: &Path,
  path: &str,
  method: &str,
  input_depth: Option<usize>,
  output_depth: Option<usize>,
) -> Result<()> {
  let document: ApiDocument = load_value(api_file)
    .with_context(|| format!("failed to load API document: {}", api_file.display()))?;

  let options = ExtractOptions {
    input_max_depth: input_depth,
    output_max_depth: output_depth,
    ..ExtractOptions::default()
  };
  let io = extract_operation_io(&document, path, method, &options)
    .with_context(|| format!("operation {} {} not found", method.to_uppercase(), path))?;

  println!("{}", serde_json::to_string_pretty(&io)?);
  Ok(())
}

fn parse_source(value: &str) -> Result<(String, PathBuf), String> {
  let (name, path) = value
    .split_once('=')
    .ok_or_else(|| format!("expected name=path, got '{}'", value))?;
  if name.is_empty() || path.is_empty() {
    return Err(format!("expected name=path, got '{}'", value));
  }
  Ok((name.to_string(), PathBuf::from(path)))
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, use empty object
    Ok(serde_json::json!({}))
  } else {
    let mut input = String::new();
    io::stdin()
      .read_to_string(&mut input)
      .context("failed to read inputs from stdin")?;

    if input.trim().is_empty() {
      Ok(serde_json::json!({}))
    } else {
      serde_json::from_str(&input).context("failed to parse inputs JSON from stdin")
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use async_trait::async_trait;
  use cobalt_auth::NoCredentials;
  use cobalt_http::{HttpRequest, HttpResponse, Transport, TransportError};

  /// Transport that signals cancellation once a request is sent and never answers.
  struct HangingTransport {
    cancel: CancellationToken,
  }

  #[async_trait]
  impl Transport for HangingTransport {
    async fn request(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
      self.cancel.cancel();
      std::future::pending().await
    }
  }

  fn single_step_engine(transport: Arc<dyn Transport>) -> WorkflowEngine {
    let document: WorkflowDocument = serde_json::from_value(serde_json::json!({
      "sourceDescriptions": [{"name": "api", "url": "./api.json", "type": "openapi"}],
      "workflows": [{
        "workflowId": "ping",
        "steps": [{"stepId": "ping", "operationId": "ping"}]
      }]
    }))
    .unwrap();
    let api = ApiDocument::new(serde_json::json!({
      "openapi": "3.0.0",
      "servers": [{"url": "https://api.example.com"}],
      "paths": {"/ping": {"get": {"operationId": "ping", "responses": {"200": {"description": "ok"}}}}}
    }));
    let collaborators = Collaborators {
      documents: Arc::new(HashMap::from([("api".to_string(), api)])),
      transport,
      credentials: Arc::new(NoCredentials),
    };
    WorkflowEngine::new(document, collaborators, EngineConfig::default()).unwrap()
  }

  #[tokio::test]
  async fn test_cancellation_interrupts_a_step_waiting_on_the_network() {
    let cancel = CancellationToken::new();
    let engine = single_step_engine(Arc::new(HangingTransport {
      cancel: cancel.clone(),
    }));
    let execution_id = engine.start_workflow("ping", Default::default()).unwrap();

    let err = tokio::time::timeout(
      Duration::from_secs(5),
      drive_execution(&engine, &execution_id, &cancel),
    )
    .await
    .expect("cancellation did not interrupt the step")
    .unwrap_err();
    assert!(err.to_string().contains("interrupted"));

    let state = engine.snapshot(&execution_id).await.unwrap();
    assert!(!state.is_terminal());
  }

  #[test]
  fn test_parse_source() {
    assert_eq!(
      parse_source("api=./specs/api.yaml").unwrap(),
      ("api".to_string(), PathBuf::from("./specs/api.yaml"))
    );
    assert!(parse_source("api").is_err());
    assert!(parse_source("=x").is_err());
  }

  #[test]
  fn test_run_config_flattens_engine_settings() {
    let config: RunConfig = serde_json::from_value(serde_json::json!({
      "mediaTypes": ["application/json"],
      "timeoutSecs": 5,
      "credentials": {
        "bearerAuth": {"location": "header", "name": "Authorization", "value": "Bearer t"}
      }
    }))
    .unwrap();

    assert_eq!(config.engine.media_types.media_types(), ["application/json"]);
    assert_eq!(config.engine.default_content_type, "application/json");
    assert_eq!(config.timeout_secs, Some(5));
    assert_eq!(
      config.credentials["bearerAuth"],
      RequestAuthValue::header("Authorization", "Bearer t")
    );
  }
}
