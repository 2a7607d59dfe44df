//! `dynablocks` command line tool.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dynablocks_assistant::{
    fetch_advice, AssistantConfig, ChatSession, CsrfToken, DocumentContext, HttpTransport, Role,
    TokenSource,
};
use dynablocks_core::condition::to_js_string;
use dynablocks_core::schema::diagnose;
use dynablocks_core::{
    build_engine, evaluate_condition, Bindings, BlockSet, ConditionKind, ConditionSpec,
    InMemoryForm,
};

#[derive(Parser, Debug)]
#[command(name = "dynablocks")]
#[command(about = "Check dynamic block schemas and resolve dependent form state")]
#[command(version)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Yaml,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a block schema (JSON or YAML)
    Check {
        schema: PathBuf,

        /// Report every structural problem instead of the first one
        #[arg(long)]
        all: bool,
    },

    /// Compute the full field and block state for a set of values
    Resolve {
        schema: PathBuf,

        /// JSON object of control name to current value
        #[arg(long)]
        values: PathBuf,

        /// JSON file with `controls` and `blocks` dependency bindings
        #[arg(long)]
        bindings: Option<PathBuf>,
    },

    /// Evaluate one condition against a value
    Eval {
        value: String,

        #[arg(long)]
        condition: String,

        /// Comparison operand for equals, not_equals, contains, greater_than, less_than
        #[arg(long)]
        operand: Option<String>,

        /// Candidate values for in and not_in
        #[arg(long, value_delimiter = ',')]
        values: Option<Vec<String>>,
    },

    /// Ask the assistant a question
    Ask {
        question: String,

        /// JSON file of form values sent as context
        #[arg(long)]
        context: Option<PathBuf>,

        #[command(flatten)]
        server: ServerArgs,
    },

    /// Fetch advice for filling in a field
    FieldHelp {
        field: String,

        #[command(flatten)]
        server: ServerArgs,
    },
}

#[derive(clap::Args, Debug)]
struct ServerArgs {
    /// Base URL of the application
    #[arg(long, env = "DYNABLOCKS_ASSISTANT_URL")]
    url: Option<String>,

    /// CSRF token sent with chat questions
    #[arg(long, env = "DYNABLOCKS_CSRF_TOKEN", hide_env_values = true)]
    csrf_token: Option<String>,

    /// Request timeout, e.g. "15s"
    #[arg(long)]
    timeout: Option<String>,
}

impl ServerArgs {
    fn transport(&self) -> Result<HttpTransport> {
        let mut config = json!({});
        if let Some(url) = &self.url {
            config["base_url"] = json!(url);
        }
        if let Some(timeout) = &self.timeout {
            config["timeout"] = json!(timeout);
        }
        let config = AssistantConfig::from_json(&config)?;

        let csrf = match &self.csrf_token {
            Some(token) => CsrfToken::new(token.as_str(), TokenSource::Config),
            None => CsrfToken::missing(),
        };
        debug!(url = %config.base_url, csrf = ?csrf, "assistant transport configured");

        Ok(HttpTransport::new(config, csrf)?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { schema, all } => check(&schema, all, cli.format),
        Commands::Resolve {
            schema,
            values,
            bindings,
        } => resolve(&schema, &values, bindings.as_deref(), cli.format),
        Commands::Eval {
            value,
            condition,
            operand,
            values,
        } => eval(&value, &condition, operand, values, cli.format),
        Commands::Ask {
            question,
            context,
            server,
        } => ask(&question, context.as_deref(), &server).await,
        Commands::FieldHelp { field, server } => field_help(&field, &server).await,
    }
}

fn check(path: &Path, all: bool, format: OutputFormat) -> Result<()> {
    if all {
        let value = read_document(path)?;
        let problems = diagnose(&value)?;
        emit(&json!({ "valid": problems.is_empty(), "problems": problems }), format, || {
            if problems.is_empty() {
                "Schema is valid".to_string()
            } else {
                problems.join("\n")
            }
        })?;
        if !problems.is_empty() {
            bail!("{} problem(s) found", problems.len());
        }
        return Ok(());
    }

    let blocks = BlockSet::from_file(path)
        .with_context(|| format!("Schema {} is invalid", path.display()))?;
    info!(blocks = blocks.len(), "schema valid");
    emit(&json!({ "valid": true, "blocks": blocks.len() }), format, || {
        format!("Schema is valid ({} blocks)", blocks.len())
    })
}

fn resolve(
    schema: &Path,
    values: &Path,
    bindings: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let blocks = BlockSet::from_file(schema)
        .with_context(|| format!("Schema {} is invalid", schema.display()))?;
    let values = values_from_json(&read_document(values)?)?;
    let bindings: Bindings = match bindings {
        Some(path) => serde_json::from_value(read_document(path)?)
            .with_context(|| format!("Bindings {} are malformed", path.display()))?,
        None => Bindings::default(),
    };

    let engine = build_engine(blocks, &bindings);
    let form = InMemoryForm::from_schema(engine.blocks(), &values);
    let state = engine.resolve(&form);

    emit(&serde_json::to_value(&state)?, format, || {
        let mut lines = Vec::new();
        for (id, block) in &state.blocks {
            lines.push(format!("block {id}: {}", if block.visible { "shown" } else { "hidden" }));
        }
        for (name, field) in &state.fields {
            lines.push(format!(
                "field {name}: visible={} enabled={} required={} value={:?}",
                field.visible, field.enabled, field.required, field.value
            ));
        }
        lines.join("\n")
    })
}

fn eval(
    value: &str,
    condition: &str,
    operand: Option<String>,
    values: Option<Vec<String>>,
    format: OutputFormat,
) -> Result<()> {
    let mut spec = ConditionSpec::new(ConditionKind::parse(condition));
    if let Some(operand) = operand {
        spec = spec.with_value(operand);
    }
    if let Some(values) = values {
        spec = spec.with_values(values);
    }

    let met = evaluate_condition(value, &spec);
    emit(&json!({ "condition": condition, "met": met }), format, || met.to_string())
}

async fn ask(question: &str, context: Option<&Path>, server: &ServerArgs) -> Result<()> {
    let context: DocumentContext = match context {
        Some(path) => values_from_json(&read_document(path)?)?,
        None => DocumentContext::new(),
    };

    let mut session = ChatSession::new(Arc::new(server.transport()?));
    let Some(reply) = session.send_question(question, context).await else {
        bail!("Question is empty");
    };

    println!("{}: {}", reply.role.speaker(), reply.content);
    if reply.role == Role::Error {
        bail!("Assistant did not answer");
    }
    Ok(())
}

async fn field_help(field: &str, server: &ServerArgs) -> Result<()> {
    let transport = server.transport()?;
    match fetch_advice(&transport, field).await {
        Some(advice) => println!("{}", advice.render()),
        None => println!("No advice available for {field}"),
    }
    Ok(())
}

/// Read a JSON or YAML document, chosen by extension.
fn read_document(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let value = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?
    };
    Ok(value)
}

/// Flatten a JSON object into form values the way a browser would submit them.
fn values_from_json(value: &Value) -> Result<BTreeMap<String, String>> {
    let Some(object) = value.as_object() else {
        bail!("Values must be a JSON object");
    };
    Ok(object
        .iter()
        .map(|(name, value)| {
            let value = match value {
                Value::Null => String::new(),
                other => to_js_string(other),
            };
            (name.clone(), value)
        })
        .collect())
}

fn emit(value: &Value, format: OutputFormat, text: impl FnOnce() -> String) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        OutputFormat::Text => println!("{}", text()),
    }
    Ok(())
}
