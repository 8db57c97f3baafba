//! reelgen - script to short-form video
//!
//! Entry point of the command-line tool: narration synthesis, word-timed
//! subtitles and burn-in compositing through external engines.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reelgen::artifacts::{BURN_IN_TRACK_NAME, PREVIEW_TRACK_NAME};
use reelgen::cli::{Args, Commands, Interrupt};
use reelgen::config::Config;
use reelgen::error::ReelError;
use reelgen::model::{Script, VideoSize, Voice};
use reelgen::preview::{PreviewSynchronizer, SurfaceSnapshot};
use reelgen::progress::{GenerationStep, StepStatus};
use reelgen::setup::{ModelStore, AVAILABLE_MODELS, REELGEN_DIR};
use reelgen::subtitle::{build_tracks, load_chunks};
use reelgen::wav::encode_wav;
use reelgen::workflow::{GenerationRequest, Workflow};

const DEFAULT_CONFIG_FILE: &str = "reelgen.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Generate {
            script,
            script_file,
            voice,
            size,
            background,
            output_dir,
            style,
        } => {
            let text = match (script, script_file) {
                (Some(text), _) => text,
                (None, Some(path)) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read script file {}", path.display()))?,
                (None, None) => bail!("Either --script or --script-file is required"),
            };
            let script = Script::new(text)?;

            let style = style.apply(&config.style);
            style.validate()?;

            let background_video = match &background {
                Some(path) => {
                    if !path.exists() {
                        return Err(ReelError::FileNotFound(path.display().to_string()).into());
                    }
                    Some(tokio::fs::read(path).await?)
                }
                None => None,
            };

            let workflow = Arc::new(Workflow::new(config)?);
            workflow.check_availability(background_video.is_some()).await?;

            // First Ctrl-C stops the composite; a second one exits outright
            let canceller = workflow.clone();
            let ctrl_c = tokio::spawn(async move {
                let mut interrupts = 0;
                while tokio::signal::ctrl_c().await.is_ok() {
                    interrupts += 1;
                    match Interrupt::nth(interrupts) {
                        Interrupt::Cancel => {
                            warn!("Interrupted, cancelling generation (press Ctrl-C again to quit)...");
                            canceller.cancel();
                        }
                        Interrupt::Quit => {
                            warn!("Interrupted again, exiting");
                            std::process::exit(130);
                        }
                    }
                }
            });

            let display = tokio::spawn(show_progress(workflow.subscribe()));
            let request = GenerationRequest {
                script,
                voice,
                style,
                video_size: size,
                background_video,
            };
            let outcome = workflow.generate(request).await;
            display.abort();
            ctrl_c.abort();

            let artifacts = outcome?;
            artifacts.save_to(&output_dir).await?;
            let primary = artifacts.primary_download();
            println!(
                "Generated {} ({} bytes, {} subtitle chunks)",
                output_dir.join(primary.file_name).display(),
                primary.bytes.len(),
                artifacts.chunks.len()
            );
        }
        Commands::Subtitles { input, size, output_dir, style } => {
            let style = style.apply(&config.style);
            style.validate()?;
            let chunks = load_chunks(&input).await?;

            let tracks = build_tracks(&chunks, &style, size);
            tokio::fs::create_dir_all(&output_dir).await?;
            tokio::fs::write(output_dir.join(PREVIEW_TRACK_NAME), &tracks.preview).await?;
            tokio::fs::write(output_dir.join(BURN_IN_TRACK_NAME), &tracks.burn_in).await?;
            println!(
                "Wrote {} cues to {} and {}",
                tracks.cue_count(),
                output_dir.join(PREVIEW_TRACK_NAME).display(),
                output_dir.join(BURN_IN_TRACK_NAME).display()
            );
        }
        Commands::Preview { input, time, width, size, style } => {
            let style = style.apply(&config.style);
            style.validate()?;
            let chunks = load_chunks(&input).await?;
            let sync = PreviewSynchronizer::new(&chunks, &style, size);
            let frame = sync.frame(&SurfaceSnapshot { time, rendered_width: width });
            println!("{}", serde_json::to_string_pretty(&frame)?);
        }
        Commands::EncodeWav { input, output, sample_rate } => {
            let raw = tokio::fs::read(&input).await?;
            if raw.len() % 4 != 0 {
                return Err(ReelError::InvalidInput(format!(
                    "{} is not a whole number of f32 samples ({} bytes)",
                    input.display(),
                    raw.len()
                ))
                .into());
            }
            let samples: Vec<f32> = raw
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();

            let wav = encode_wav(&samples, sample_rate);
            tokio::fs::write(&output, &wav).await?;
            println!("Wrote {} samples to {}", samples.len(), output.display());
        }
        Commands::Voices => {
            println!("{:<12} {:<20}", "Id", "Voice");
            println!("{}", "-".repeat(32));
            for voice in Voice::ALL {
                println!("{:<12} {:<20}", voice.id(), voice.label());
            }
        }
        Commands::Sizes => {
            println!("{:<8} {:<12}", "Label", "Resolution");
            println!("{}", "-".repeat(20));
            for size in VideoSize::PRESETS {
                println!("{:<8} {}x{}", size.aspect_ratio_label, size.width, size.height);
            }
        }
        Commands::Models { download } => {
            let store = ModelStore::default();
            println!("\nAvailable Whisper Models:");
            println!("{:<12} {:<22} {:<10} {:<10}", "Name", "Filename", "Size (MB)", "Status");
            println!("{}", "-".repeat(56));
            for model in AVAILABLE_MODELS.iter() {
                let status = if store.is_installed(model) { "Downloaded" } else { "Missing" };
                println!("{:<12} {:<22} {:<10.1} {:<10}", model.name, model.filename(), model.size_mb, status);
            }

            match download.as_deref() {
                None => {}
                Some("") => {
                    info!("Downloading all missing models...");
                    for model in AVAILABLE_MODELS.iter().filter(|m| !store.is_installed(m)) {
                        store.download_model(model).await?;
                    }
                }
                Some(name) => {
                    let model = ModelStore::find(name)
                        .ok_or_else(|| ReelError::InvalidInput(format!("Unknown model '{}'", name)))?;
                    store.download_model(model).await?;
                }
            }
        }
        Commands::InitConfig { output, force } => {
            if output.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", output.display());
            }
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
    }

    Ok(())
}

/// Render one bar per pipeline step until aborted
async fn show_progress(mut steps: tokio::sync::watch::Receiver<Vec<GenerationStep>>) {
    let multi = MultiProgress::new();
    let style = ProgressStyle::default_bar()
        .template("{prefix:>22} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");

    let bars: Vec<ProgressBar> = steps
        .borrow()
        .iter()
        .map(|step| {
            let bar = multi.add(ProgressBar::new(100));
            bar.set_style(style.clone());
            bar.set_prefix(step.name);
            bar
        })
        .collect();

    loop {
        let snapshot = steps.borrow_and_update().clone();
        for (bar, step) in bars.iter().zip(&snapshot) {
            bar.set_position(step.progress.round() as u64);
            bar.set_message(match step.status {
                StepStatus::Pending => "pending",
                StepStatus::Processing => "running",
                StepStatus::Completed => "done",
                StepStatus::Error => "failed",
            });
        }
        if steps.changed().await.is_err() {
            break;
        }
    }
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(REELGEN_DIR).join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "reelgen.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}", log_level, log_dir.join("reelgen.log").display());
    Ok(())
}
