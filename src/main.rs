mod adapters;
mod config;
mod core;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::llm::{create_adapter, GenerationParams, LLMAdapter};

#[derive(Parser)]
#[command(name = "diffcritic")]
#[command(about = "Persona-driven LLM feedback on a git diff, a file or a directory", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(long, env = "PERSONA", help = "Reviewer persona (developer, kent_beck, marc_benioff, yoda)")]
    persona: Option<String>,

    #[arg(long, env = "STYLE", help = "Feedback style (concise, zen)")]
    style: Option<String>,

    #[arg(long, env = "DIFFCRITIC_PROVIDER", help = "LLM provider (openai, anthropic, ollama)")]
    provider: Option<String>,

    #[arg(long, env = "MODEL")]
    model: Option<String>,

    #[arg(long)]
    temperature: Option<f32>,

    #[arg(long)]
    max_tokens: Option<usize>,

    #[arg(long, help = "Override the provider API base URL")]
    base_url: Option<String>,

    #[arg(long, help = "Append the full contents of files touched by the diff")]
    include_files: bool,

    #[arg(long, conflicts_with = "include_files", help = "Do not append file contents, even if configured")]
    no_include_files: bool,

    #[arg(long, conflicts_with = "dir", help = "Review this file instead of a diff")]
    filename: Option<PathBuf>,

    #[arg(long, help = "Review every file under this directory instead of a diff")]
    dir: Option<PathBuf>,

    #[arg(long, default_value = "origin/master", help = "Base revision when diffing the current branch")]
    base: String,

    #[arg(long, help = "Print the prompt without calling the provider")]
    dry_run: bool,

    #[arg(short, long, help = "Output file path (prints to stdout if not provided)")]
    output: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> config::CliOverrides {
        config::CliOverrides {
            provider: self.provider.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            persona: self.persona.clone(),
            style: self.style.clone(),
            include_files: match (self.include_files, self.no_include_files) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            },
            base_url: self.base_url.clone(),
        }
    }

    fn diff_source(&self) -> core::DiffSource {
        if let Some(path) = &self.filename {
            core::DiffSource::File(path.clone())
        } else if let Some(dir) = &self.dir {
            core::DiffSource::Dir(dir.clone())
        } else if !std::io::stdin().is_terminal() {
            core::DiffSource::Stdin
        } else {
            core::DiffSource::Git {
                base: self.base.clone(),
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = config::Config::load()?;
    config.merge_with_cli(cli.overrides());
    config.normalize();

    // Configuration problems are fatal and must surface before any request.
    let adapter = if cli.dry_run {
        None
    } else {
        config.resolve_api_key(|name| std::env::var(name).ok())?;
        let model_config = config.model_config()?;
        Some((create_adapter(&model_config)?, model_config.params))
    };

    let source = cli.diff_source();
    debug!("Reading review input from {:?}", source);
    let mut diff = source.read()?;
    if diff.trim().is_empty() && matches!(source, core::DiffSource::Stdin) {
        info!("Nothing on stdin, falling back to git diff against {}", cli.base);
        diff = core::DiffSource::Git {
            base: cli.base.clone(),
        }
        .read()?;
    }

    let formatter = core::FileContentFormatter::new(PathBuf::from("."))
        .with_max_chars(config.max_file_chars);
    let builder = core::PromptBuilder::new(config.prompt_config(), formatter);
    let prompt = builder.build_prompt(&diff, None);
    debug!("Prompt ({} chars):\n{}", prompt.len(), prompt);

    let text = match adapter {
        None => format!("PROMPT:\n{}", prompt),
        Some((adapter, params)) => review(adapter.as_ref(), &prompt, &params).await,
    };

    emit(&text, cli.output.as_deref())
}

/// Runs the review and turns every post-dispatch failure into printable text.
async fn review(adapter: &dyn LLMAdapter, prompt: &str, params: &GenerationParams) -> String {
    info!(
        "Requesting review from {} with model {}",
        adapter.provider_name(),
        params.model
    );

    match adapter.generate_review(prompt, params).await {
        Ok(text) => text,
        Err(err) => {
            warn!("Review failed: {}", err);
            err.to_string()
        }
    }
}

fn emit(text: &str, output: Option<&std::path::Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", text),
    }
    Ok(())
}
