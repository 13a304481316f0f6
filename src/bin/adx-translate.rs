//! adx-translate: Kusto to Spark SQL translation assistant
//!
//! # Usage
//!
//! ```bash
//! # Canonical template of a query
//! adx-translate template "Events | where Level == 'Error'"
//!
//! # Closest corpus examples
//! adx-translate similar --file query.kql -k 5
//!
//! # Full translation
//! OPEN_AI_API_KEY=... adx-translate translate --file query.kql
//! ```

use adx_translate::catalog;
use adx_translate::prelude::*;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use serde_json::json;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "adx-translate")]
#[command(version)]
#[command(about = "Canonicalize Kusto queries and translate them to Spark SQL", long_about = None)]
#[command(after_help = "EXAMPLES:
    adx-translate clean --file query.kql
    adx-translate template 'Events | where Name == \"x\"' --functions functions.csv
    adx-translate similar --file query.kql -k 3 --corpus ground_truths.json
    adx-translate translate --file query.kql")]
struct Cli {
    /// Configuration file (defaults to ./adx-translate.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Function catalog CSV (overrides [catalog].functions)
    #[arg(long, global = true)]
    functions: Option<PathBuf>,

    /// Table catalog CSV (overrides [catalog].tables)
    #[arg(long, global = true)]
    tables: Option<PathBuf>,

    /// Example corpus JSON (overrides [corpus].path)
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,

    /// Verbose logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

/// A query given inline, from a file, or on stdin.
#[derive(clap::Args)]
struct QueryInput {
    /// The query text (read from --file or stdin when omitted)
    query: Option<String>,

    /// Read the query from a file
    #[arg(short, long)]
    file: Option<PathBuf>,
}

impl QueryInput {
    fn read(&self) -> Result<String> {
        if let Some(query) = &self.query {
            return Ok(query.clone());
        }
        if let Some(path) = &self.file {
            return std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()));
        }
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read query from stdin")?;
        Ok(buf)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Strip comments and indentation
    Clean {
        #[command(flatten)]
        input: QueryInput,

        /// Treat the input as Spark SQL (`--` comments)
        #[arg(long)]
        sql: bool,
    },
    /// Show the canonical template and its placeholder bindings
    Template {
        #[command(flatten)]
        input: QueryInput,
    },
    /// List the corpus examples closest to a query
    Similar {
        #[command(flatten)]
        input: QueryInput,

        /// Number of examples (defaults to [retrieval].top_k)
        #[arg(short)]
        k: Option<usize>,
    },
    /// Group near-duplicate queries
    Group {
        /// JSON array of queries (defaults to the corpus source queries)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Similarity threshold (defaults to [retrieval].group_threshold)
        #[arg(short, long)]
        threshold: Option<f64>,
    },
    /// Show the functions and tables each catalog function depends on
    Deps {
        /// Only this function
        name: Option<String>,
    },
    /// Translate a query with retrieved examples
    Translate {
        #[command(flatten)]
        input: QueryInput,

        /// Maximum completion attempts (defaults to [llm].max_attempts)
        #[arg(long)]
        max_attempts: Option<usize>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let mut config = Config::discover(cli.config.as_deref())?;
    if let Some(path) = &cli.functions {
        config.catalog.functions = Some(path.clone());
    }
    if let Some(path) = &cli.tables {
        config.catalog.tables = Some(path.clone());
    }
    if let Some(path) = &cli.corpus {
        config.corpus.path = Some(path.clone());
    }

    match &cli.command {
        Commands::Clean { input, sql } => {
            let query = input.read()?;
            let cleaned = if *sql { clean_sql(&query) } else { clean(&query) };
            println!("{}", cleaned);
        }
        Commands::Template { input } => {
            let canonicalizer = load_canonicalizer(&config)?;
            let template = canonicalizer.template(&input.read()?)?;
            print_template(&template, cli.format);
        }
        Commands::Similar { input, k } => {
            let canonicalizer = load_canonicalizer(&config)?;
            let index = SimilarityIndex::new(load_corpus(&config)?);
            let template = canonicalizer.to_template(&input.read()?)?;
            let k = k.unwrap_or(config.retrieval.top_k);
            let scored: Vec<_> = index.scored(&template).into_iter().take(k).collect();
            print_similar(&scored, cli.format);
        }
        Commands::Group { input, threshold } => {
            let queries = match input {
                Some(path) => read_queries(path)?,
                None => load_corpus(&config)?
                    .iter()
                    .map(|e| e.source_query.clone())
                    .collect(),
            };
            let threshold = threshold.unwrap_or(config.retrieval.group_threshold);
            let labels = group_by_threshold(&queries, threshold);
            print_groups(&queries, &labels, cli.format);
        }
        Commands::Deps { name } => {
            let (names, records) = load_names(&config)?;
            let defs = FunctionDef::from_catalog(&records, &names);
            let defs: Vec<_> = defs
                .iter()
                .filter(|d| name.as_ref().is_none_or(|n| &d.name == n))
                .collect();
            if defs.is_empty() {
                if let Some(name) = name {
                    anyhow::bail!("Unknown function: {}", name);
                }
            }
            print_deps(&defs, cli.format);
        }
        Commands::Translate {
            input,
            max_attempts,
        } => {
            let canonicalizer = load_canonicalizer(&config)?;
            let index = SimilarityIndex::new(load_corpus(&config)?);
            let client = OpenAiClient::from_config(&config.llm)?;
            let options = TranslatorOptions {
                top_k: config.retrieval.top_k,
                max_attempts: max_attempts.unwrap_or(config.llm.max_attempts),
                ..Default::default()
            };
            let translator = Translator::new(canonicalizer, index, client).with_options(options);
            let translation = translator.translate(&input.read()?).await?;
            print_translation(&translation, cli.format, cli.verbose);
        }
    }

    Ok(())
}

fn load_names(config: &Config) -> Result<(NameUniverse, Vec<FunctionRecord>)> {
    let records = match &config.catalog.functions {
        Some(path) => catalog::load_functions(path)?,
        None => Vec::new(),
    };
    let tables = match &config.catalog.tables {
        Some(path) => catalog::load_table_names(path)?,
        None => Vec::new(),
    };
    if records.is_empty() && tables.is_empty() {
        tracing::warn!("no function or table catalog configured");
    }
    let names = NameUniverse::new(records.iter().map(|r| r.name.clone()), tables);
    Ok((names, records))
}

fn load_canonicalizer(config: &Config) -> Result<Canonicalizer> {
    let (names, _) = load_names(config)?;
    let keywords = match &config.catalog.keywords {
        Some(path) => KeywordSet::load(path)?,
        None => KeywordSet::kusto(),
    };
    Ok(Canonicalizer::new(names, keywords))
}

fn load_corpus(config: &Config) -> Result<Corpus> {
    let path = config
        .corpus
        .path
        .as_deref()
        .context("No corpus configured. Use --corpus or set [corpus].path")?;
    Ok(Corpus::load(path)?)
}

fn read_queries(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON array of strings", path.display()))
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn print_template(template: &Template, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&json!({
            "template": template.text,
            "functions_and_tables": template.functions_and_tables,
            "variables": template.variables,
            "strings": template.strings,
        })),
        OutputFormat::Table => {
            println!("{}", "Template:".green().bold());
            println!("{}", template.text.white());

            let bindings = template.bindings();
            if !bindings.is_empty() {
                println!();
                println!("{}", "Bindings:".cyan());
                let width = bindings.iter().map(|(p, _)| p.len()).max().unwrap_or(0);
                for (placeholder, value) in bindings {
                    println!("  {:width$} = {}", placeholder, value.yellow(), width = width);
                }
            }
        }
    }
}

fn print_similar(scored: &[(&CorpusEntry, f64)], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let rows: Vec<_> = scored
                .iter()
                .map(|(e, score)| {
                    json!({ "score": score, "kql": e.source_query, "sql": e.target_query })
                })
                .collect();
            print_json(&json!(rows));
        }
        OutputFormat::Table => {
            if scored.is_empty() {
                println!("{}", "(no examples)".dimmed());
                return;
            }
            for (i, (entry, score)) in scored.iter().enumerate() {
                println!(
                    "{} {}",
                    format!("#{}", i + 1).cyan().bold(),
                    format!("score {:.3}", score).dimmed()
                );
                println!("{}", entry.source_query.white());
                println!("{}", entry.target_query.yellow());
                println!();
            }
        }
    }
}

fn print_groups(queries: &[String], labels: &[Option<usize>], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let rows: Vec<_> = queries
                .iter()
                .zip(labels)
                .map(|(q, label)| json!({ "group": label, "query": q }))
                .collect();
            print_json(&json!(rows));
        }
        OutputFormat::Table => {
            println!("{:6} │ {}", "Group".white().bold(), "Query".white().bold());
            println!("{}", "─".repeat(60).dimmed());
            for (query, label) in queries.iter().zip(labels) {
                let group = label.map(|g| g.to_string()).unwrap_or_else(|| "-".to_string());
                let first_line = query.lines().next().unwrap_or_default();
                println!("{:6} │ {}", group.cyan(), first_line);
            }
            let groups = labels.iter().flatten().max().map_or(0, |g| g + 1);
            println!();
            println!("{} group(s)", groups.to_string().cyan());
        }
    }
}

fn print_deps(defs: &[&FunctionDef], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let rows: Vec<_> = defs
                .iter()
                .map(|d| {
                    json!({
                        "name": d.name,
                        "folder": d.folder,
                        "functions": d.used_functions,
                        "tables": d.used_tables,
                    })
                })
                .collect();
            print_json(&json!(rows));
        }
        OutputFormat::Table => {
            for def in defs {
                println!("{} {}", def.name.cyan().bold(), def.folder.dimmed());
                let join = |set: &std::collections::BTreeSet<String>| {
                    set.iter().cloned().collect::<Vec<_>>().join(", ")
                };
                println!("  {} {}", "functions:".dimmed(), join(&def.used_functions));
                println!("  {} {}", "tables:".dimmed(), join(&def.used_tables));
            }
        }
    }
}

fn print_translation(translation: &Translation, format: OutputFormat, verbose: bool) {
    match format {
        OutputFormat::Json => print_json(&json!({
            "template": translation.template.text,
            "examples": translation.examples,
            "attempts": translation.attempts,
            "sql": translation.sql,
        })),
        OutputFormat::Table => {
            if verbose {
                println!("{} {}", "Template:".dimmed(), translation.template.text.yellow());
                println!(
                    "{} {} example(s), {} attempt(s)",
                    "Retrieved:".dimmed(),
                    translation.examples.len(),
                    translation.attempts
                );
                println!();
            }
            println!("{}", "Spark SQL:".green().bold());
            println!("{}", translation.sql.white());
        }
    }
}
