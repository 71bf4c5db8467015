use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use phishscan::config::{self, Config};
use phishscan::features::lexical::LexicalFeatureExtractor;
use phishscan::features::traits::FeatureExtractor;
use phishscan::output::json::JsonReport;
use phishscan::output::{terminal, DEMO_URLS};
use phishscan::pipeline::Pipeline;

/// phishscan: classify URLs as phishing or benign from lexical features.
///
/// Loads a pre-trained classifier and its feature scaler, then scores each
/// URL using only what can be read off the URL string itself.
#[derive(Parser)]
#[command(name = "phishscan", version, about)]
struct Cli {
    /// Classifier artifact (LightGBM JSON dump or .onnx)
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Scaler artifact (JSON)
    #[arg(long, global = true)]
    scaler: Option<PathBuf>,

    /// Scores above this are labeled phishing (default: 0.5)
    #[arg(long, global = true)]
    threshold: Option<f64>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the built-in list of six sample URLs (the default)
    Demo,

    /// Classify URLs given as arguments and/or listed in a file
    Classify {
        /// URLs to classify
        urls: Vec<String>,

        /// Read additional URLs from a file, one per line (# starts a comment)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Print a JSON report instead of result lines
        #[arg(long)]
        json: bool,
    },

    /// Show the lexical features extracted from a URL
    Features {
        /// The URL to inspect
        url: String,
    },

    /// Show what the configured artifacts contain and whether they agree
    Inspect,
}

fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout carries only results
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("phishscan=info")),
        )
        .init();

    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stdout().is_terminal();
    let config = resolve_config(&cli)?;

    match cli.command.unwrap_or(Commands::Demo) {
        Commands::Demo => {
            config.require_artifacts()?;
            // Load before printing anything so a bad artifact leaves stdout empty
            let pipeline = Pipeline::load(&config, Box::new(LexicalFeatureExtractor))?;

            let mut out = std::io::stdout().lock();
            terminal::write_report(&mut out, &pipeline, "Testing Multiple URLs", &DEMO_URLS, color)?;
        }

        Commands::Classify { urls, file, json } => {
            let mut urls = urls;
            let from_file = match &file {
                Some(path) => {
                    let listed = read_url_file(path)?;
                    info!(count = listed.len(), "Read URLs from {}", path.display());
                    urls.extend(listed);
                    true
                }
                None => false,
            };

            if urls.is_empty() {
                anyhow::bail!("No URLs to classify. Pass URLs as arguments or use --file.");
            }

            config.require_artifacts()?;
            let pipeline = Pipeline::load(&config, Box::new(LexicalFeatureExtractor))?;
            let mut out = std::io::stdout().lock();

            if json {
                let results = urls
                    .iter()
                    .map(|url| pipeline.classify(url))
                    .collect::<Result<Vec<_>>>()?;
                let report = JsonReport::new(&results, pipeline.model().describe(), pipeline.threshold());
                writeln!(out, "{}", report.to_json()?)?;
                return Ok(());
            }

            let progress = if from_file && std::io::stderr().is_terminal() {
                url_progress_bar(urls.len() as u64)
            } else {
                ProgressBar::hidden()
            };

            let results = terminal::write_results(&mut out, &pipeline, &urls, color, &progress)?;
            progress.finish_and_clear();

            let flagged = results
                .iter()
                .filter(|r| r.label == phishscan::pipeline::Label::Phishing)
                .count();
            info!(total = results.len(), flagged, "Classification complete");
        }

        Commands::Features { url } => {
            let extractor = LexicalFeatureExtractor;
            let features = extractor.extract(&url);
            let mut out = std::io::stdout().lock();
            terminal::write_features(&mut out, &url, &features)?;
        }

        Commands::Inspect => inspect(&config, color)?,
    }

    Ok(())
}

/// Environment config with command-line overrides applied.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load()?;
    if let Some(path) = &cli.model {
        config = config.with_model_path(path.clone());
    }
    if let Some(path) = &cli.scaler {
        config = config.with_scaler_path(path.clone());
    }
    if let Some(threshold) = cli.threshold {
        config = config.with_threshold(threshold)?;
    }
    Ok(config)
}

/// One URL per line; blank lines and `#` comments are skipped.
fn read_url_file(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL list {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

fn url_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  [{bar:40.cyan/blue}] {pos}/{len} URLs ({eta})")
            .expect("valid template")
            .progress_chars("=> "),
    );
    pb
}

fn inspect(config: &Config, color: bool) -> Result<()> {
    let heading = |text: &str| {
        if color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    };

    println!("{}", heading("=== Artifacts ==="));
    println!("  Model:     {} ({})", config.model_path.display(), config.model_backend.as_str());
    println!("  Scaler:    {}", config.scaler_path.display());
    println!("  Threshold: {}", config.threshold);
    if (config.threshold - config::DEFAULT_THRESHOLD).abs() > f64::EPSILON {
        println!("  (default is {})", config::DEFAULT_THRESHOLD);
    }

    let scaler = phishscan::scaling::load_scaler(&config.scaler_path)
        .with_context(|| format!("Failed to load scaler from {}", config.scaler_path.display()))?;
    let model = phishscan::model::load_classifier(
        &config.model_path,
        config.model_backend,
        &config.onnx_names,
        Some(scaler.width()),
    )
    .with_context(|| format!("Failed to load model from {}", config.model_path.display()))?;

    println!("\n{}", heading("=== Model ==="));
    println!("  {}", model.describe());

    println!("\n{}", heading("=== Scaler ==="));
    println!("  Kind: {}  Features: {}", scaler.kind().as_str(), scaler.width());
    match scaler.feature_names() {
        Some(names) => println!("  Names: {}", names.join(", ")),
        None => println!("  Names: not recorded"),
    }

    let extractor = LexicalFeatureExtractor;
    println!("\n{}", heading("=== Extractor ==="));
    println!("  Lexical features: {}", extractor.feature_names().len());

    match phishscan::pipeline::column_order(extractor.feature_names(), &scaler, model.as_ref()) {
        Ok(_) => {
            let ok = if color { "ok".green().to_string() } else { "ok".to_string() };
            println!("\n  Alignment: {ok}");
            Ok(())
        }
        Err(e) => {
            let bad = if color { "MISMATCH".red().bold().to_string() } else { "MISMATCH".to_string() };
            println!("\n  Alignment: {bad}");
            Err(e)
        }
    }
}
