//! Binary entry point for lorekeeper.
//!
//! This binary provides the CLI for building, validating, and querying
//! corpora, and for running full question-answering orchestration.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use lorekeeper::config::{EmbeddingProviderKind, LlmProviderKind, LorekeeperConfig};
use lorekeeper::corpus::{Corpus, CorpusBuilder};
use lorekeeper::embedding::{Embedder, EmbeddingCache, HashEmbedder, OpenAiEmbedder};
use lorekeeper::llm::{AnthropicClient, LlmHttpConfig, LlmProvider, OllamaClient};
use lorekeeper::models::{Document, Entity, RetrievalRequest};
use lorekeeper::orchestrator::{KnowledgeSource, QueryOrchestrator};
use lorekeeper::retrieval::RetrievalEngine;
use lorekeeper::taxonomy::Intent;
use lorekeeper::{Error, observability};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Lorekeeper - retrieval orchestration for tabletop-RPG character assistants.
#[derive(Parser)]
#[command(name = "lorekeeper")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Build an embedded corpus from a JSON document dump.
    Build {
        /// Path to the input manifest (documents and entities, no vectors).
        input: PathBuf,

        /// Path to write the corpus blob to.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Validate a corpus blob (hierarchy and reference checks).
    Validate {
        /// Path to the corpus blob.
        corpus: PathBuf,
    },

    /// Run a one-shot retrieval query against one corpus, without an LLM.
    Query {
        /// Path to the corpus blob.
        corpus: PathBuf,

        /// The query text.
        query: String,

        /// Query intent name (see `intents` for the list).
        #[arg(short, long, default_value = "general")]
        intent: String,

        /// Entity names to boost (comma-separated).
        #[arg(short, long)]
        entities: Option<String>,

        /// Context hints to blend (comma-separated).
        #[arg(long)]
        hints: Option<String>,

        /// Maximum number of results.
        #[arg(short, long, default_value = "5")]
        k: usize,

        /// Print full excerpts instead of a ranked summary.
        #[arg(long)]
        content: bool,
    },

    /// Answer a question using full three-phase orchestration.
    Ask {
        /// The question.
        query: String,

        /// Identifier of the character the question is about.
        #[arg(long, default_value = "default")]
        subject: String,

        /// Knowledge source as `name=path[=description]`. Repeatable.
        #[arg(short = 's', long = "source", required = true)]
        sources: Vec<String>,

        /// Print per-phase timing metrics to stderr.
        #[arg(long)]
        metrics: bool,
    },

    /// List the valid intent names and their category mappings.
    Intents,
}

/// Input manifest for `build`: documents and entities without vectors.
#[derive(Debug, Deserialize)]
struct CorpusManifest {
    /// Documents to include.
    #[serde(default)]
    documents: Vec<Document>,
    /// Entities to include.
    #[serde(default)]
    entities: Vec<Entity>,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    observability::init_logging(cli.verbose);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    match run_command(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

fn load_config(path: Option<&str>) -> lorekeeper::Result<LorekeeperConfig> {
    path.map_or_else(
        || Ok(LorekeeperConfig::load_default()),
        |p| LorekeeperConfig::load_from_file(std::path::Path::new(p)),
    )
}

fn run_command(cli: Cli, config: &LorekeeperConfig) -> lorekeeper::Result<()> {
    match cli.command {
        Commands::Build { input, output } => run_build(config, &input, &output),
        Commands::Validate { corpus } => run_validate(&corpus),
        Commands::Query {
            corpus,
            query,
            intent,
            entities,
            hints,
            k,
            content,
        } => run_query(config, &corpus, &query, &intent, entities, hints, k, content),
        Commands::Ask {
            query,
            subject,
            sources,
            metrics,
        } => run_ask(config, &query, &subject, &sources, metrics),
        Commands::Intents => {
            run_intents();
            Ok(())
        },
    }
}

/// Constructs the configured embedding provider and its model identifier.
fn build_embedder(config: &LorekeeperConfig) -> (Arc<dyn Embedder>, String) {
    match config.embedding.provider {
        EmbeddingProviderKind::Hash => {
            let embedder = HashEmbedder::new(config.embedding.dimensions);
            let model_id = embedder.model_id();
            (Arc::new(embedder), model_id)
        },
        EmbeddingProviderKind::OpenAi => {
            let mut embedder =
                OpenAiEmbedder::new().with_dimensions(config.embedding.dimensions);
            if let Some(key) = &config.embedding.api_key {
                embedder = embedder.with_api_key(key);
            }
            if let Some(url) = &config.embedding.base_url {
                embedder = embedder.with_endpoint(url);
            }
            let model_id = config
                .embedding
                .model
                .clone()
                .unwrap_or_else(|| OpenAiEmbedder::DEFAULT_MODEL.to_string());
            if let Some(model) = &config.embedding.model {
                embedder = embedder.with_model(model);
            }
            (Arc::new(embedder), model_id)
        },
    }
}

/// Constructs the configured LLM provider.
fn build_llm(config: &LorekeeperConfig) -> Arc<dyn LlmProvider> {
    let http = LlmHttpConfig::from_config(&config.llm).with_env_overrides();
    match config.llm.provider {
        LlmProviderKind::Anthropic => {
            let mut client = AnthropicClient::new().with_http_config(http);
            if let Some(key) = &config.llm.api_key {
                client = client.with_api_key(key);
            }
            if let Some(url) = &config.llm.base_url {
                client = client.with_endpoint(url);
            }
            if let Some(model) = &config.llm.model {
                client = client.with_model(model);
            }
            Arc::new(client)
        },
        LlmProviderKind::Ollama => {
            let mut client = OllamaClient::new().with_http_config(http);
            if let Some(url) = &config.llm.base_url {
                client = client.with_endpoint(url);
            }
            if let Some(model) = &config.llm.model {
                client = client.with_model(model);
            }
            Arc::new(client)
        },
    }
}

fn run_build(
    config: &LorekeeperConfig,
    input: &PathBuf,
    output: &PathBuf,
) -> lorekeeper::Result<()> {
    let contents = std::fs::read_to_string(input).map_err(|e| Error::OperationFailed {
        operation: "read_manifest".to_string(),
        cause: format!("{}: {e}", input.display()),
    })?;
    let manifest: CorpusManifest =
        serde_json::from_str(&contents).map_err(|e| Error::InvalidInput(format!(
            "manifest {}: {e}",
            input.display()
        )))?;

    let (embedder, model_id) = build_embedder(config);
    let mut builder = CorpusBuilder::new(model_id);
    for document in manifest.documents {
        builder.push_document(document)?;
    }
    for entity in manifest.entities {
        builder.push_entity(entity)?;
    }

    let corpus = builder.build(embedder.as_ref())?;
    corpus.save(output)?;
    println!(
        "Built corpus: {} documents, {} entities, model '{}' -> {}",
        corpus.len(),
        corpus.entities().count(),
        corpus.embedding_model(),
        output.display()
    );
    Ok(())
}

fn run_validate(path: &PathBuf) -> lorekeeper::Result<()> {
    // load runs the full hierarchy validation
    let corpus = Corpus::load(path)?;
    let embedded = corpus
        .documents()
        .filter(|d| d.embedding.is_some())
        .count();
    println!(
        "OK: {} documents ({embedded} embedded), {} entities, model '{}'",
        corpus.len(),
        corpus.entities().count(),
        corpus.embedding_model()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_query(
    config: &LorekeeperConfig,
    corpus: &PathBuf,
    query: &str,
    intent: &str,
    entities: Option<String>,
    hints: Option<String>,
    k: usize,
    content: bool,
) -> lorekeeper::Result<()> {
    let intent = Intent::parse(intent)
        .ok_or_else(|| Error::InvalidInput(format!("unknown intent '{intent}'")))?;
    let (embedder, _) = build_embedder(config);
    let cache = Arc::new(EmbeddingCache::new(config.cache.capacity));
    let engine = RetrievalEngine::from_path(corpus, embedder, cache, config.scoring)?;

    let request = RetrievalRequest::new(intent, query, k)
        .with_entities(split_list(entities))
        .with_context_hints(split_list(hints));
    let (results, report) = engine.query(&request);

    if results.is_empty() {
        println!("No results ({} candidates after pruning).", report.candidates);
        return Ok(());
    }
    for (rank, result) in results.iter().enumerate() {
        println!(
            "{:2}. [{:.3}] {} ({})",
            rank + 1,
            result.score,
            result.title,
            result.document_id
        );
        if !result.matched_entities.is_empty() {
            println!("    entities: {}", result.matched_entities.join(", "));
        }
        if content {
            println!("{}\n", result.content);
        }
    }
    Ok(())
}

fn run_ask(
    config: &LorekeeperConfig,
    query: &str,
    subject: &str,
    sources: &[String],
    show_metrics: bool,
) -> lorekeeper::Result<()> {
    let (embedder, _) = build_embedder(config);
    let llm = build_llm(config);

    let mut orchestrator = QueryOrchestrator::new(llm, config.orchestrator);
    for arg in sources {
        let (name, path, description) = parse_source_arg(arg)?;
        let cache = Arc::new(EmbeddingCache::new(config.cache.capacity));
        let engine =
            RetrievalEngine::from_path(path, Arc::clone(&embedder), cache, config.scoring)?;
        orchestrator = orchestrator.with_source(KnowledgeSource::new(name, description, engine));
    }

    let (answer, perf) = orchestrator.answer_with_metrics(query, subject);
    println!("{answer}");
    if show_metrics {
        eprintln!(
            "decision {}ms / retrieval {}ms / synthesis {}ms; sources {}/{}/{} (considered/needed/contributing)",
            perf.decision_ms,
            perf.retrieval_ms,
            perf.synthesis_ms,
            perf.sources_considered,
            perf.sources_needed,
            perf.sources_contributing
        );
    }
    Ok(())
}

fn run_intents() {
    for intent in Intent::all() {
        let categories: Vec<&str> = intent.categories().iter().map(|c| c.as_str()).collect();
        if categories.is_empty() {
            println!("{} -> (full corpus)", intent.as_str());
        } else {
            println!("{} -> {}", intent.as_str(), categories.join(", "));
        }
    }
}

/// Splits a comma-separated CLI list, dropping empty items.
fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(ToString::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Parses a `name=path[=description]` source argument.
fn parse_source_arg(arg: &str) -> lorekeeper::Result<(String, String, String)> {
    let mut parts = arg.splitn(3, '=');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(name), Some(path), description) if !name.is_empty() && !path.is_empty() => {
            let description = description
                .filter(|d| !d.is_empty())
                .map_or_else(|| format!("knowledge source '{name}'"), ToString::to_string);
            Ok((name.to_string(), path.to_string(), description))
        },
        _ => Err(Error::InvalidInput(format!(
            "source '{arg}' is not in name=path[=description] form"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(Some("Fireball, Shield ,".to_string())),
            vec!["Fireball".to_string(), "Shield".to_string()]
        );
        assert!(split_list(None).is_empty());
    }

    #[test]
    fn test_parse_source_arg() {
        let (name, path, description) =
            parse_source_arg("rulebook=rules.json=the game rules").unwrap();
        assert_eq!(name, "rulebook");
        assert_eq!(path, "rules.json");
        assert_eq!(description, "the game rules");

        let (_, _, default_description) = parse_source_arg("sheet=sheet.json").unwrap();
        assert!(default_description.contains("sheet"));

        assert!(parse_source_arg("nonsense").is_err());
        assert!(parse_source_arg("=x").is_err());
    }
}
