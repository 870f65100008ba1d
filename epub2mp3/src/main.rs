// epub2mp3 - Convert EPUB files to per-chapter MP3 audio using text-to-speech

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;

use epub2mp3::config::Epub2Mp3Config;
use epub2mp3::jobs::ChapterJob;
use epub2mp3::pipeline::{Pipeline, PipelineOptions};
use epub2mp3::progress::{FileStore, ProgressStore, RunIdentity};
use epub2mp3::{epub, report};
use tts_client::{ProviderOptions, TtsProvider};

const DEFAULT_OUTPUT_DIR: &str = "output_audio";

#[derive(Parser, Debug)]
#[command(name = "epub2mp3")]
#[command(about = "Convert EPUB files to per-chapter MP3 audio using text-to-speech", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the EPUB file
    epub_file: Option<PathBuf>,

    /// Voice to use for TTS
    #[arg(short, long)]
    voice: Option<String>,

    /// Directory for the generated MP3 files (default: output_audio)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Maximum parallel conversions
    #[arg(short, long)]
    concurrent: Option<u32>,

    /// Maximum retries per chapter
    #[arg(short, long)]
    retries: Option<u32>,

    /// TTS provider to use
    #[arg(short, long)]
    provider: Option<String>,

    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    /// Configuration subcommand
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set default voice
    SetVoice {
        /// Voice name to use
        voice: String,
    },
    /// Set default provider
    SetProvider {
        /// Provider name (openai, local)
        provider: String,
    },
    /// Set default number of parallel conversions
    SetConcurrency {
        /// Number of parallel conversions
        concurrency: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle config subcommands
    if let Some(Commands::Config { action }) = &args.command {
        return handle_config_command(action);
    }

    // Load configuration
    let config = Epub2Mp3Config::load().context("Failed to load configuration")?;

    let voice = args.voice.unwrap_or(config.voice);
    let provider_name = args.provider.as_deref().unwrap_or(&config.provider);
    let concurrency = args.concurrent.unwrap_or(config.concurrency);
    let max_retries = args.retries.unwrap_or(config.max_retries);
    let output_dir = args
        .output_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

    // Fail on nonsensical configuration before touching the book
    if concurrency < 1 {
        anyhow::bail!("concurrency must be at least 1");
    }

    let provider_options = ProviderOptions {
        model: config.model.clone(),
        base_url: config.base_url.clone(),
        api_key_env: config.api_key_env.clone(),
    };
    let provider: Arc<dyn TtsProvider> =
        Arc::from(tts_client::get_provider(provider_name, &provider_options)?);

    // Require EPUB file for conversion
    let epub_path = args
        .epub_file
        .ok_or_else(|| anyhow::anyhow!("EPUB file path is required"))?;

    if !epub_path.exists() {
        anyhow::bail!("EPUB file not found: {}", epub_path.display());
    }

    if args.debug {
        eprintln!("EPUB: {}", epub_path.display());
        eprintln!("Output: {}", output_dir.display());
        eprintln!("Provider: {}", provider.name());
        eprintln!("Voice: {}", voice);
        eprintln!("Concurrency: {}", concurrency);
        eprintln!("Max retries: {}", max_retries);
    }

    // Parse EPUB
    eprintln!("Parsing EPUB: {}", epub_path.display());
    let book = epub::parse_epub(&epub_path).context("Failed to parse EPUB")?;

    eprintln!(
        "Book: \"{}\" by {}",
        book.title,
        book.author.as_deref().unwrap_or("Unknown")
    );
    eprintln!(
        "Chapters: {}, Words: ~{}",
        book.chapters.len(),
        book.total_words()
    );

    if book.chapters.is_empty() {
        anyhow::bail!("No chapters found in EPUB");
    }

    let chapters: Vec<ChapterJob> = book
        .chapters
        .into_iter()
        .enumerate()
        .map(|(index, chapter)| ChapterJob {
            index: index as u32,
            title: chapter.title,
            text: chapter.content,
            voice: voice.clone(),
        })
        .collect();

    // Resume state keyed by (book, voice, output dir)
    let identity = RunIdentity::new(&epub_path, &voice, &output_dir);
    let state_dir = FileStore::default_state_dir()?;
    let store = FileStore::open(&state_dir, &identity)?;

    let already_done = chapters
        .iter()
        .filter(|c| store.is_done(c.index))
        .count();
    if already_done > 0 {
        eprintln!("Resuming: {} chapters already converted", already_done);
    }

    // Create progress bar
    let pb = ProgressBar::new((chapters.len() - already_done) as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} chapters")
            .unwrap(),
    );

    let options = PipelineOptions::new(output_dir.clone(), concurrency, max_retries);
    let pipeline = Pipeline::new(provider, Arc::new(store), options)?.with_progress(pb.clone());

    // Abandoned in-flight chapters stay unrecorded, so a resume retries them
    let summary = tokio::select! {
        result = pipeline.run(chapters) => result?,
        _ = tokio::signal::ctrl_c() => {
            pb.abandon();
            eprintln!("\nInterrupted. Completed chapters are saved; rerun to resume.");
            std::process::exit(130);
        }
    };

    pb.finish_and_clear();
    report::print_summary(&summary);

    if summary.is_success() {
        eprintln!(
            "All audio files saved to: {}",
            output_dir.display()
        );
        Ok(())
    } else {
        std::process::exit(1);
    }
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Epub2Mp3Config::load()?;
            println!("Configuration file: {:?}", Epub2Mp3Config::config_path()?);
            println!();
            println!("provider = \"{}\"", config.provider);
            println!("voice = \"{}\"", config.voice);
            println!("concurrency = {}", config.concurrency);
            println!("max_retries = {}", config.max_retries);
            if let Some(base_url) = &config.base_url {
                println!("base_url = \"{}\"", base_url);
            }
        }
        ConfigAction::SetVoice { voice } => {
            let mut config = Epub2Mp3Config::load()?;
            config.voice = voice.clone();
            config.save()?;
            println!("Default voice set to: {}", voice);
        }
        ConfigAction::SetProvider { provider } => {
            let mut config = Epub2Mp3Config::load()?;
            config.provider = provider.clone();
            config.save()?;
            println!("Default provider set to: {}", provider);
        }
        ConfigAction::SetConcurrency { concurrency } => {
            let mut config = Epub2Mp3Config::load()?;
            config.concurrency = *concurrency;
            config.save()?;
            println!("Default concurrency set to: {}", concurrency);
        }
    }
    Ok(())
}
