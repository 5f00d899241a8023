use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use console::style;
use manimator_core::{
    GeminiScriptGenerator, KokoroSynthesizer, ManimRenderer, ManimatorConfig, ManimatorError,
    PipelineOptions, Provider, VideoPipeline, VideoSource, fix_code, format_duration,
    format_outcome_readable,
};
use tokio::fs;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::progress::{SpinnerProgress, create_spinner};

mod progress;

#[derive(Parser)]
#[command(name = "manimator")]
#[command(about = "Turn a text idea or a PDF into a narrated Manim animation")]
struct Cli {
    /// Extra configuration file layered over the defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate, narrate and render a video
    Generate(GenerateArgs),
    /// Ask the model to repair Manim code that failed to render
    Fix(FixArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Idea or concept to animate
    #[arg(long, conflicts_with = "pdf", required_unless_present = "pdf")]
    idea: Option<String>,

    /// PDF document to summarize
    #[arg(long)]
    pdf: Option<PathBuf>,

    /// Where to write the final video
    #[arg(short, long, default_value = "final_output.mp4")]
    output: PathBuf,

    /// Fix-and-rerender rounds after the first render fails
    #[arg(long)]
    retries: Option<u32>,

    /// Keep the intermediate job directory
    #[arg(long)]
    keep_work_dir: bool,
}

#[derive(Args)]
struct FixArgs {
    /// File with the failing Manim code
    #[arg(long)]
    code: PathBuf,

    /// Error output, either a file or the text itself
    #[arg(long)]
    error: String,

    /// The request the code was written for
    #[arg(long, default_value = "")]
    context: String,

    /// Write the fixed code here instead of printing it
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_with_error(e: &dyn std::fmt::Display) -> ! {
    eprintln!("{} {}", style("Error:").red().bold(), e);
    std::process::exit(1);
}

async fn read_error_text(error: &str) -> Result<String> {
    let path = Path::new(error);
    if path.is_file() {
        fs::read_to_string(path)
            .await
            .with_context(|| format!("reading error output from {}", path.display()))
    } else {
        Ok(error.to_string())
    }
}

async fn run_generate(config: ManimatorConfig, args: GenerateArgs) -> Result<()> {
    let source = match (args.idea, args.pdf) {
        (Some(idea), _) => VideoSource::Idea(idea),
        (None, Some(path)) => VideoSource::Pdf { path },
        (None, None) => exit_with_error(&ManimatorError::MissingSource),
    };

    let mut options = PipelineOptions::from_config(&config);
    if let Some(retries) = args.retries {
        options.max_retries = retries;
    }
    options.keep_work_dir |= args.keep_work_dir;
    debug!(?options, "Pipeline options");

    println!(
        "\n{}  {}\n",
        style("manimator").cyan().bold(),
        style("Idea to Animation").dim()
    );
    println!("{}", style("─".repeat(60)).dim());

    let progress = SpinnerProgress::new(options.max_retries);
    let pipeline = VideoPipeline::new(
        GeminiScriptGenerator::new(&config.gemini),
        KokoroSynthesizer::new(&config.tts),
        ManimRenderer::new(&config.render),
        options,
    );

    let total_start = Instant::now();
    let outcome = match pipeline.run(&source, &args.output, &progress).await {
        Ok(outcome) => outcome,
        Err(e) => exit_with_error(&e),
    };
    info!(
        attempts = outcome.attempts,
        video = %outcome.video_path.display(),
        "Video saved"
    );

    println!(
        "\n{} {}\n",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );
    println!(
        "{} {}",
        style("Saved:").dim(),
        style(outcome.video_path.display()).cyan()
    );
    println!("{}", style("─".repeat(60)).dim());
    println!("{}", format_outcome_readable(&outcome));

    Ok(())
}

async fn run_fix(config: ManimatorConfig, args: FixArgs) -> Result<()> {
    let faulty_code = fs::read_to_string(&args.code)
        .await
        .with_context(|| format!("reading code from {}", args.code.display()))?;
    let error_message = read_error_text(&args.error).await?;

    let generator = GeminiScriptGenerator::new(&config.gemini);
    let spinner = create_spinner(&format!(
        "Asking {} to fix the code...",
        generator.provider().name()
    ));
    let fixed = match fix_code(&generator, &faulty_code, &error_message, &args.context).await {
        Ok(fixed) => {
            spinner.finish_with_message(format!("{} Code fixed", style("✓").green().bold()));
            fixed
        }
        Err(e) => {
            spinner.finish_and_clear();
            exit_with_error(&e);
        }
    };

    match &args.output {
        Some(path) => {
            fs::write(path, &fixed.manim_code).await?;
            info!(path = %path.display(), "Wrote fixed code");
            println!(
                "{} {}",
                style("Saved:").dim(),
                style(path.display()).cyan()
            );
        }
        None => println!("\n{}", fixed.manim_code),
    }

    println!("{}", style("─".repeat(60)).dim());
    println!("## Narration\n\n{}", fixed.narration);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = match ManimatorConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => exit_with_error(&e),
    };
    info!(
        model = %config.gemini.generate_model,
        tts = %config.tts.base_url,
        "Loaded configuration"
    );

    // Validate API key early
    if let Err(e) = Provider::from_config(&config.gemini).validate_api_key() {
        exit_with_error(&e);
    }

    match cli.command {
        Command::Generate(args) => run_generate(config, args).await,
        Command::Fix(args) => run_fix(config, args).await,
    }
}
