use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

use framesift::{
    DedupMode, NullRecognizer, ProcessOptions, SceneDetectionMode, SceneOptions, TextRegion,
    VideoFile, detect_scenes,
};

const CLI_AFTER_HELP: &str = "Examples:\n  framesift process input.mp4 --out frames --every 30\n  framesift process videos/ --out frames --scene-detection --keyframes-per-scene 3\n  framesift scenes input.mp4 --json\n  framesift metadata input.mp4 --json\n  framesift completions zsh > _framesift";

#[derive(Debug, Parser)]
#[command(
    name = "framesift",
    version,
    about = "Extract deduplicated, text-annotated frames from videos",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Show additional logging output.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Process a video (or a directory of videos) through the pipeline.
    #[command(
        about = "Extract and deduplicate frames",
        after_help = "Examples:\n  framesift process input.mp4 --out frames --every 30 --dedup-mode both\n  framesift process videos/ --out frames --scene-detection --length 1h30m"
    )]
    Process {
        /// Path to a video file or a directory containing videos.
        input: PathBuf,
        /// Base output directory; each video gets a subdirectory.
        #[arg(long, default_value = "output")]
        out: PathBuf,
        /// Sample every Nth frame (ignored with --scene-detection).
        #[arg(long, default_value_t = 30)]
        every: u64,
        /// Use scene-aware sampling instead of a fixed interval.
        #[arg(long)]
        scene_detection: bool,
        /// Scene cut threshold (0-100).
        #[arg(long, default_value_t = 30.0)]
        scene_threshold: f64,
        /// Minimum scene length in frames.
        #[arg(long, default_value_t = 15)]
        min_scene_len: u64,
        /// Keyframes extracted per scene.
        #[arg(long, default_value_t = 3)]
        keyframes_per_scene: u64,
        /// Deduplication mode: ssim | text | both.
        #[arg(long, default_value = "both")]
        dedup_mode: DedupMode,
        /// Imagery-similarity threshold.
        #[arg(long, default_value_t = 0.9)]
        ssim_threshold: f64,
        /// Text-similarity threshold.
        #[arg(long, default_value_t = 0.85)]
        text_threshold: f64,
        /// Frame region for recognition: all | top | bottom.
        #[arg(long, default_value = "all")]
        region: TextRegion,
        /// Recognition language code.
        #[arg(long, default_value = "eng")]
        lang: String,
        /// Number of analysis workers.
        #[arg(long, default_value_t = 4)]
        workers: usize,
        /// Worker batch size.
        #[arg(long, default_value_t = 8)]
        batch_size: usize,
        /// Also save frames without meaningful recognized text.
        #[arg(long)]
        include_empty: bool,
        /// Only process the first part of each video (e.g. 1h30m, 45s).
        #[arg(long)]
        length: Option<String>,
        /// Allow writing into existing output directories.
        #[arg(long)]
        overwrite: bool,
    },

    /// Detect scene boundaries and print the intervals.
    #[command(about = "Detect scenes")]
    Scenes {
        /// Input video path.
        input: PathBuf,
        /// Scene cut threshold (0-100).
        #[arg(long, default_value_t = 30.0)]
        threshold: f64,
        /// Minimum scene length in frames.
        #[arg(long, default_value_t = 15)]
        min_scene_len: u64,
        /// Force full analysis instead of the automatic strategy.
        #[arg(long)]
        full: bool,
        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print metadata for a video file.
    #[command(about = "Print video metadata", visible_alias = "probe")]
    Metadata {
        /// Input video path.
        input: PathBuf,
        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Parse a duration like `1h30m45s`, `90m`, or plain seconds (`45`).
fn parse_duration(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("duration cannot be empty".to_string());
    }

    if let Ok(seconds) = trimmed.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }

    let mut total_seconds: u64 = 0;
    let mut digits = String::new();
    let mut any_unit = false;

    for c in trimmed.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let scale = match c {
            'h' => 3600,
            'm' => 60,
            's' => 1,
            _ => return Err(format!("invalid duration: {value} (use e.g. 1h30m or 45s)")),
        };
        if digits.is_empty() {
            return Err(format!("invalid duration: {value} (use e.g. 1h30m or 45s)"));
        }
        let amount: u64 = digits
            .parse()
            .map_err(|_| format!("invalid duration: {value}"))?;
        total_seconds += amount * scale;
        digits.clear();
        any_unit = true;
    }

    if !digits.is_empty() || !any_unit {
        return Err(format!("invalid duration: {value} (use e.g. 1h30m or 45s)"));
    }

    Ok(Duration::from_secs(total_seconds))
}

/// Collect the video files referenced by `input` (a file or a directory).
fn collect_video_files(input: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm"];

    let has_video_extension = |path: &Path| {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    };

    if input.is_file() {
        if !has_video_extension(input) {
            return Err(format!("{} is not a supported video format", input.display()).into());
        }
        return Ok(vec![input.to_path_buf()]);
    }

    if input.is_dir() {
        let mut files: Vec<PathBuf> = fs::read_dir(input)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_video_extension(path))
            .collect();
        files.sort();
        if files.is_empty() {
            return Err(format!("no video files found in {}", input.display()).into());
        }
        return Ok(files);
    }

    Err(format!("input path {} does not exist", input.display()).into())
}

fn video_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string())
}

async fn run_process(
    input: PathBuf,
    out: PathBuf,
    options: ProcessOptions,
    overwrite: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let files = collect_video_files(&input)?;
    println!("Found {} video file(s) to process", files.len());

    let progress = if files.len() > 1 {
        let bar = ProgressBar::new(files.len() as u64);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Some(bar)
    } else {
        None
    };

    let recognizer = Arc::new(NullRecognizer);
    let mut succeeded = 0usize;

    for file in &files {
        let stem = video_stem(file);
        let video_output = out.join(&stem);

        if video_output.exists() && !overwrite {
            eprintln!(
                "{} {}",
                "error:".red().bold(),
                format!(
                    "output directory already exists: {} (use --overwrite)",
                    video_output.display()
                )
                .red()
            );
            if let Some(bar) = &progress {
                bar.inc(1);
            }
            continue;
        }

        if let Some(bar) = &progress {
            bar.set_message(stem.clone());
        }

        match framesift::process_video(file, &video_output, recognizer.clone(), &options).await {
            Ok(manifest) => {
                succeeded += 1;
                println!(
                    "{} {}",
                    "success:".green().bold(),
                    format!(
                        "{}: saved {} of {} frame(s) to {}",
                        manifest.video_name,
                        manifest.frames_saved,
                        manifest.total_frames_processed,
                        video_output.display()
                    )
                    .green()
                );
            }
            Err(error) => {
                // A bad video fails alone; the batch moves on.
                eprintln!(
                    "{} {}",
                    "error:".red().bold(),
                    format!("{}: {error}", file.display()).red()
                );
            }
        }

        if let Some(bar) = &progress {
            bar.inc(1);
        }
    }

    if let Some(bar) = progress {
        bar.finish_with_message("done");
    }

    println!(
        "\nProcessing completed: {succeeded}/{} video(s) processed successfully",
        files.len()
    );

    if succeeded == 0 {
        return Err("no videos were processed successfully".into());
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "info" }),
    )
    .init();

    match cli.command {
        Commands::Process {
            input,
            out,
            every,
            scene_detection,
            scene_threshold,
            min_scene_len,
            keyframes_per_scene,
            dedup_mode,
            ssim_threshold,
            text_threshold,
            region,
            lang,
            workers,
            batch_size,
            include_empty,
            length,
            overwrite,
        } => {
            if every == 0 {
                return Err("--every must be greater than 0".into());
            }

            let mut options = ProcessOptions::new()
                .with_dedup_mode(dedup_mode)
                .with_region(region)
                .with_language(lang)
                .with_workers(workers)
                .with_batch_size(batch_size)
                .with_ssim_threshold(ssim_threshold)
                .with_text_threshold(text_threshold)
                .with_only_with_text(!include_empty);

            options = if scene_detection {
                options.with_scene_sampling(
                    SceneOptions::new()
                        .threshold(scene_threshold)
                        .min_scene_len(min_scene_len),
                    keyframes_per_scene,
                )
            } else {
                options.with_interval(every)
            };

            if let Some(length) = length {
                let limit = parse_duration(&length)?;
                println!("Processing limit set to {length} ({}s)", limit.as_secs());
                options = options.with_max_duration(limit);
            }

            run_process(input, out, options, overwrite).await?;
        }
        Commands::Scenes {
            input,
            threshold,
            min_scene_len,
            full,
            json,
        } => {
            let mut video = VideoFile::open(&input)?;
            let fps = video.info().frames_per_second;
            let mut scene_options = SceneOptions::new()
                .threshold(threshold)
                .min_scene_len(min_scene_len);
            if full {
                scene_options = scene_options.mode(SceneDetectionMode::Full);
            }
            let scenes = detect_scenes(&mut video, &scene_options)?;

            if json {
                let payload: Vec<_> = scenes
                    .iter()
                    .map(|scene| {
                        json!({
                            "start_frame": scene.start,
                            "end_frame": scene.end,
                            "start_seconds": if fps > 0.0 { scene.start as f64 / fps } else { 0.0 },
                            "end_seconds": if fps > 0.0 { scene.end as f64 / fps } else { 0.0 },
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for (index, scene) in scenes.iter().enumerate() {
                    println!(
                        "scene {index}: frames {}..{} ({} frame(s))",
                        scene.start,
                        scene.end,
                        scene.len()
                    );
                }
                println!("{} scene(s) detected", scenes.len());
            }
        }
        Commands::Metadata { input, json } => {
            let video = VideoFile::open(&input)?;
            let info = video.info();
            if json {
                let payload = json!({
                    "format": info.format,
                    "duration_seconds": info.duration.as_secs_f64(),
                    "width": info.width,
                    "height": info.height,
                    "fps": info.frames_per_second,
                    "frame_count": info.frame_count,
                    "codec": info.codec,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Format: {}", info.format);
                println!("Duration: {:.2}s", info.duration.as_secs_f64());
                println!(
                    "Video: {}x{} @ {:.2} fps [{}], ~{} frames",
                    info.width, info.height, info.frames_per_second, info.codec, info.frame_count,
                );
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framesift", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
