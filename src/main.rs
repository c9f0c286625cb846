use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use emotion_fusion::config::{Config, OutputFormat};
use emotion_fusion::producer::{Cached, ModelOutputProducer};
use emotion_fusion::session::{SessionRecord, SessionSummary};
use emotion_fusion::timeline::EmotionTimeline;
use emotion_fusion::{
    map_speech_distribution, AudioEmotionProducer, EmotionDistribution, FusionPipeline,
    FusionRecord, MediaInput, SpeechDistribution,
};

/// Multimodal emotion fusion of facial and speech model outputs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file (defaults to ~/.emotionfusion/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format: "pretty" or "json" (overrides the config file)
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fuse whole-file predictions of a recording
    Fuse {
        /// Facial model output for the video file (JSON)
        #[arg(long)]
        video: PathBuf,

        /// Speech model output for the audio track (JSON)
        #[arg(long)]
        audio: PathBuf,
    },

    /// Translate a speech model output into the facial vocabulary
    MapAudio {
        /// Speech model output (JSON)
        #[arg(long)]
        audio: PathBuf,
    },

    /// Fuse a recorded stream of frame/chunk predictions (JSON lines)
    Stream {
        /// Input file, one {"offset_ms", "frame", "audio"} object per line.
        /// `frame` and `audio` are model output objects or base64 data URIs.
        #[arg(short, long)]
        input: PathBuf,

        /// Timeline bucket width in seconds (overrides the config file)
        #[arg(long)]
        interval_secs: Option<u64>,

        /// Print the emotion heatmap after the session summary
        #[arg(long)]
        heatmap: bool,
    },
}

/// One line of a stream file
#[derive(Debug, Deserialize)]
struct StreamObservation {
    #[serde(default)]
    offset_ms: u64,
    frame: serde_json::Value,
    audio: serde_json::Value,
}

/// Messages from the stream processor thread
enum StreamMessage {
    Record(FusionRecord),
    Error { line: usize, message: String },
    Stopped,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    if let Some(format) = args.format {
        config.output_format = format;
    }
    debug!("Config: {:?}", config);

    let video = Arc::new(Cached::<_, EmotionDistribution>::new(
        ModelOutputProducer::new(),
        config.cache_capacity,
    ));
    let audio = Arc::new(Cached::<_, SpeechDistribution>::new(
        ModelOutputProducer::new(),
        config.cache_capacity,
    ));
    let pipeline = FusionPipeline::new(video.clone(), audio.clone());

    match args.command {
        Command::Fuse { video, audio } => run_fuse(&pipeline, &video, &audio, config.output_format),
        Command::MapAudio { audio } => run_map_audio(&audio, config.output_format),
        Command::Stream {
            input,
            interval_secs,
            heatmap,
        } => {
            if let Some(secs) = interval_secs {
                config.timeline_interval_secs = secs;
                config.validate()?;
            }
            let result = run_stream(pipeline, input, &config, heatmap).await;
            debug!("Cache stats: video={:?} audio={:?}", video.stats(), audio.stats());
            result
        }
    }
}

fn run_fuse(
    pipeline: &FusionPipeline,
    video: &Path,
    audio: &Path,
    format: OutputFormat,
) -> Result<()> {
    let record = pipeline
        .analyze_files(video, audio)
        .context("Fusion failed")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Pretty => {
            print_record(&record);
            println!("\n--- Fused Distribution ---");
            for (emotion, score) in record.result.emotion_distribution.iter() {
                println!("  {:<9} {:.3}", emotion.as_str(), score);
            }
        }
    }
    Ok(())
}

fn run_map_audio(audio: &Path, format: OutputFormat) -> Result<()> {
    let speech = ModelOutputProducer::new()
        .predict_audio(&MediaInput::File(audio.to_path_buf()))
        .context("Failed to read speech model output")?;
    let mapped = map_speech_distribution(&speech);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&mapped)?),
        OutputFormat::Pretty => {
            for (emotion, score) in mapped.iter() {
                println!("  {:<9} {:.3}", emotion.as_str(), score);
            }
        }
    }
    Ok(())
}

async fn run_stream(
    pipeline: FusionPipeline,
    input: PathBuf,
    config: &Config,
    heatmap: bool,
) -> Result<()> {
    let file = std::fs::File::open(&input)
        .with_context(|| format!("Failed to open stream file {:?}", input))?;
    info!("Streaming observations from {:?}", input);

    // Create channels
    let (tx, mut rx) = mpsc::channel::<StreamMessage>(32);
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();

    // Spawn processor thread
    let processor_handle = std::thread::spawn(move || {
        run_processor(std::io::BufReader::new(file), pipeline, tx, stop_flag_clone);
    });

    // Set up Ctrl+C handler
    let stop_flag_ctrlc = stop_flag.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, stopping...");
        stop_flag_ctrlc.store(true, Ordering::SeqCst);
    });

    let mut session = SessionRecord::new();
    let mut error_count = 0usize;

    while let Some(msg) = rx.recv().await {
        match msg {
            StreamMessage::Record(record) => {
                match config.output_format {
                    OutputFormat::Json => println!("{}", serde_json::to_string(&record)?),
                    OutputFormat::Pretty => print_record(&record),
                }
                session.add_record(record);
            }
            StreamMessage::Error { line, message } => {
                error_count += 1;
                error!("Line {}: {}", line, message);
            }
            StreamMessage::Stopped => {
                info!("Processor stopped");
                break;
            }
        }
    }

    // Wait for processor thread
    let _ = processor_handle.join();

    session.finalize();
    if error_count > 0 {
        warn!("{} observations could not be fused", error_count);
    }

    let summary = session.summary();
    match config.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&summary)?),
        OutputFormat::Pretty => print_summary(&summary, session.total_duration_ms),
    }

    if heatmap {
        let timeline = EmotionTimeline::build(&session.records, config.timeline_interval())
            .context("Failed to build emotion timeline")?;
        match config.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string(&timeline.heatmap())?),
            OutputFormat::Pretty if !timeline.is_empty() => print_heatmap(&timeline),
            OutputFormat::Pretty => {}
        }
    }

    info!("Session complete");
    Ok(())
}

/// Reads observations line by line and fuses each one
fn run_processor<R: BufRead>(
    reader: R,
    pipeline: FusionPipeline,
    tx: mpsc::Sender<StreamMessage>,
    stop_flag: Arc<AtomicBool>,
) {
    for (index, line) in reader.lines().enumerate() {
        if stop_flag.load(Ordering::SeqCst) {
            break;
        }
        let line_no = index + 1;

        let msg = match line {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => match fuse_observation(&pipeline, &line) {
                Ok(record) => StreamMessage::Record(record),
                Err(e) => StreamMessage::Error {
                    line: line_no,
                    message: format!("{:#}", e),
                },
            },
            Err(e) => StreamMessage::Error {
                line: line_no,
                message: format!("read failed: {}", e),
            },
        };

        if tx.blocking_send(msg).is_err() {
            warn!("Receiver dropped, stopping processor");
            return;
        }
    }

    let _ = tx.blocking_send(StreamMessage::Stopped);
}

fn fuse_observation(pipeline: &FusionPipeline, line: &str) -> Result<FusionRecord> {
    let observation: StreamObservation =
        serde_json::from_str(line).context("Invalid observation")?;
    let frame = observation_input(observation.frame).context("Invalid frame")?;
    let chunk = observation_input(observation.audio).context("Invalid audio chunk")?;

    pipeline
        .analyze_realtime(&frame, &chunk, observation.offset_ms)
        .map_err(Into::into)
}

/// A JSON string is a base64 data URI of the media; anything else is
/// model output carried inline.
fn observation_input(value: serde_json::Value) -> Result<MediaInput> {
    match value {
        serde_json::Value::String(uri) => Ok(MediaInput::from_data_uri(&uri)?),
        other => Ok(MediaInput::Inline(serde_json::to_vec(&other)?)),
    }
}

fn format_ms(ms: u64) -> String {
    format!("{:02}:{:02}.{:03}", ms / 60000, (ms % 60000) / 1000, ms % 1000)
}

fn print_record(record: &FusionRecord) {
    let result = &record.result;
    let compound = result
        .compound_emotion
        .map(|c| format!(" [{}]", c))
        .unwrap_or_default();
    println!(
        "[{}] {} ({}, conf {:.2}){} valence {:+.1} arousal {:+.1}",
        format_ms(record.offset_ms),
        result.dominant_emotion,
        result.intensity,
        result.confidence,
        compound,
        result.valence,
        result.arousal
    );
}

fn print_summary(summary: &SessionSummary, total_duration_ms: u64) {
    println!("\n--- Session Summary ---");
    println!("Duration: {:.1}s", total_duration_ms as f64 / 1000.0);
    println!("Records: {}", summary.record_count);
    if let Some(emotion) = summary.prevailing_emotion {
        println!("Prevailing emotion: {}", emotion);
    }
    println!("Compound moments: {}", summary.compound_count);
    println!("Mean confidence: {:.2}", summary.mean_confidence);
    println!(
        "Mean valence/arousal: {:+.2} / {:+.2}",
        summary.mean_valence, summary.mean_arousal
    );
    for (emotion, count) in &summary.dominant_counts {
        if *count > 0 {
            println!("  {:<9} {}", emotion.as_str(), count);
        }
    }
}

fn print_heatmap(timeline: &EmotionTimeline) {
    let heatmap = timeline.heatmap();
    println!("\n--- Emotion Heatmap ---");
    print!("{:<9}", "");
    for label in &heatmap.time_labels {
        print!(" {:>5}", label);
    }
    println!();
    for (emotion, row) in heatmap.emotions.iter().zip(&heatmap.values) {
        print!("{:<9}", emotion.as_str());
        for value in row {
            print!(" {:>5.2}", value);
        }
        println!();
    }
}
