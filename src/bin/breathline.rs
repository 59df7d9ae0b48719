//! CLI binary for breathline.

use breathline::audio::{CpalOutput, open_output_or_null, render_to_vec, write_wav_mono};
use breathline::narration::{CommandSpeech, CueLibrary, OutputCuePlayer, SpeechBackend};
use breathline::session::{
    FilePreferences, Frame, PreferenceStore, RenderSink, SessionLog, SessionRunner,
};
use breathline::synth::{MasterGain, SignalGraph, clamp_volume};
use breathline::{
    AmbienceProfile, AmbientSynth, BreathlineConfig, Narrator, SessionConfig, SessionController,
    VoiceProfile, paths,
};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Breathline: guided breathing with procedural ambience and narration.
#[derive(Parser)]
#[command(name = "breathline", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not write a log file under the data directory.
    #[arg(long)]
    no_log_file: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Run a guided breathing session.
    Run(RunArgs),

    /// List the built-in techniques.
    Techniques,

    /// List voices offered by the host speech service.
    Voices,

    /// List available audio output devices.
    Devices,

    /// Show session history and totals.
    History {
        /// Number of recent sessions to show.
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Render an ambience profile to a WAV file.
    Preview {
        /// Profile to render.
        profile: AmbienceProfile,

        /// Output WAV path.
        #[arg(short, long, default_value = "ambience.wav")]
        out: PathBuf,

        /// Length in seconds.
        #[arg(short, long, default_value_t = 10.0)]
        seconds: f32,

        /// Master volume in [0, 1].
        #[arg(long, default_value_t = 0.5)]
        volume: f32,

        /// Render sample rate.
        #[arg(long, default_value_t = 48_000)]
        sample_rate: u32,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    /// Technique id (box, 4-7-8, coherent, sos).
    #[arg(short, long)]
    technique: Option<String>,

    /// Session length in minutes.
    #[arg(short, long, conflicts_with = "seconds")]
    minutes: Option<f64>,

    /// Session length in seconds.
    #[arg(short, long)]
    seconds: Option<f64>,

    /// Ambience profile.
    #[arg(short, long)]
    ambience: Option<AmbienceProfile>,

    /// Ambience volume in [0, 1].
    #[arg(long)]
    volume: Option<f32>,

    /// Voice profile, e.g. en-GB-male or british-female.
    #[arg(long)]
    voice: Option<String>,

    /// Disable narration.
    #[arg(long)]
    no_narration: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_tracing(!cli.no_log_file);

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(BreathlineConfig::default_config_path);
    let config = BreathlineConfig::load_or_default(&config_path)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli.command.unwrap_or(Command::Run(RunArgs::default())) {
        Command::Run(args) => runtime.block_on(run_session(config, args)),
        Command::Techniques => list_techniques(),
        Command::Voices => runtime.block_on(list_voices()),
        Command::Devices => list_devices(),
        Command::History { limit } => show_history(limit),
        Command::Preview {
            profile,
            out,
            seconds,
            volume,
            sample_rate,
        } => preview(&config, profile, &out, seconds, volume, sample_rate),
    }
}

/// Console logging plus an optional daily log file.
///
/// The returned guard flushes the file writer on drop.
fn init_tracing(log_file: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("breathline=info,symphonia=warn"));
    let console = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let appender = log_file
        .then(|| {
            let dir = paths::logs_dir();
            std::fs::create_dir_all(&dir).ok()?;
            tracing_appender::rolling::RollingFileAppender::builder()
                .rotation(tracing_appender::rolling::Rotation::DAILY)
                .filename_prefix("breathline")
                .filename_suffix("log")
                .build(dir)
                .ok()
        })
        .flatten();

    match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .init();
            None
        }
    }
}

async fn run_session(config: BreathlineConfig, args: RunArgs) -> anyhow::Result<()> {
    println!("Breathline v{}", env!("CARGO_PKG_VERSION"));

    let preferences = Arc::new(FilePreferences::open_default());
    let stored = preferences.load();
    let mut session = SessionConfig::from_defaults(&config, Some(&stored));
    if let Some(technique) = args.technique {
        session.technique_id = technique;
    }
    if let Some(minutes) = args.minutes {
        session.total_duration_secs = minutes * 60.0;
    }
    if let Some(seconds) = args.seconds {
        session.total_duration_secs = seconds;
    }
    if let Some(profile) = args.ambience {
        session.ambience.profile = profile;
    }
    if let Some(volume) = args.volume {
        session.ambience.volume = clamp_volume(volume);
    }
    if let Some(voice) = args.voice.as_deref() {
        session.voice = VoiceProfile::parse_lossy(voice);
    }
    if args.no_narration {
        session.narration_enabled = false;
    }

    let narrator = build_narrator(&config);
    let synth = AmbientSynth::new(open_output_or_null(&config.audio), &config.ambience);
    let controller = SessionController::new(synth, narrator, Arc::new(SessionLog::open_default()))
        .with_settings(config.session.clone())
        .with_renderer(Box::new(TerminalRenderer::default()))
        .with_preferences(preferences);

    println!("Commands: p = pause, r = resume, + / - = volume, q = stop. Ctrl+C quits.\n");

    let mut volume = session.ambience.volume;
    let handle = SessionRunner::new(controller).spawn(session);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl+C, stopping session");
                handle.cancel();
                break;
            }
            line = lines.next_line(), if stdin_open => {
                let sent = match line {
                    Ok(Some(line)) => match line.trim() {
                        "p" => handle.pause().await,
                        "r" => handle.resume().await,
                        "q" => handle.stop().await,
                        "+" => {
                            volume = clamp_volume(volume + 0.1);
                            handle.set_volume(volume).await
                        }
                        "-" => {
                            volume = clamp_volume(volume - 0.1);
                            handle.set_volume(volume).await
                        }
                        _ => true,
                    },
                    Ok(None) | Err(_) => {
                        stdin_open = false;
                        true
                    }
                };
                if !sent {
                    break;
                }
            }
            () = tokio::time::sleep(Duration::from_millis(200)) => {
                if handle.is_finished() {
                    break;
                }
            }
        }
    }

    let (record, _controller) = handle.finished().await?;
    println!();
    match record {
        Some(record) => println!(
            "{} session: {} cycles in {:.1} minutes ({}).",
            if record.completed { "Completed" } else { "Stopped" },
            record.cycles,
            record.duration_minutes(),
            record.pattern
        ),
        None => println!("Session ended before any progress was made."),
    }
    Ok(())
}

fn build_narrator(config: &BreathlineConfig) -> Narrator {
    let narration = &config.narration;
    let mut builder = Narrator::builder(narration);
    match CommandSpeech::detect() {
        Some(speech) => {
            info!("host speech: {}", speech.id());
            builder = builder.backend(Arc::new(speech));
        }
        None => warn!("no host speech program found, narration uses recorded cues only"),
    }
    let player =
        OutputCuePlayer::new(open_output_or_null(&config.audio)).with_gain(narration.cue_volume);
    builder
        .cues(CueLibrary::new(narration.cue_root()), Box::new(player))
        .build()
}

/// Single-line progress display on stdout.
#[derive(Default)]
struct TerminalRenderer {
    last_phase: Option<usize>,
}

const BAR_WIDTH: usize = 24;

impl RenderSink for TerminalRenderer {
    fn frame(&mut self, frame: &Frame) {
        if self.last_phase != Some(frame.phase_index) && self.last_phase.is_some() {
            println!();
        }
        self.last_phase = Some(frame.phase_index);

        let filled = ((frame.phase_progress * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
        let remaining = frame.remaining_secs.ceil() as u64;
        print!(
            "\r{:<8} [{}{}] {:>3.0}%  {:02}:{:02} left",
            frame.phase_name,
            "#".repeat(filled),
            " ".repeat(BAR_WIDTH - filled),
            frame.session_progress * 100.0,
            remaining / 60,
            remaining % 60
        );
        let _ = std::io::stdout().flush();
    }
}

fn list_techniques() -> anyhow::Result<()> {
    let catalog = breathline::TechniqueCatalog::builtin();
    for technique in catalog.iter() {
        println!(
            "{:<10} {:<18} {:<10} {}",
            technique.id(),
            technique.display_name(),
            technique.pattern(),
            technique.description()
        );
    }
    Ok(())
}

async fn list_voices() -> anyhow::Result<()> {
    let Some(speech) = CommandSpeech::detect() else {
        println!("No host speech program (espeak-ng, espeak or say) found.");
        return Ok(());
    };
    if tokio::time::timeout(Duration::from_secs(5), speech.voices_ready())
        .await
        .is_err()
    {
        warn!("voice discovery still running after 5s");
    }
    println!("Voices from {}:", speech.id());
    for voice in speech.voices() {
        println!("  {:<28} {:<8} {}", voice.id, voice.lang, voice.name);
    }
    Ok(())
}

fn list_devices() -> anyhow::Result<()> {
    println!("Output devices:");
    for name in CpalOutput::list_output_devices()? {
        println!("  - {name}");
    }
    Ok(())
}

fn show_history(limit: usize) -> anyhow::Result<()> {
    let log = SessionLog::open_default();
    let history = log.load()?;
    let stats = &history.stats;
    println!(
        "{} sessions, {} cycles, {:.1} minutes total",
        stats.total_sessions, stats.total_cycles, stats.total_minutes
    );
    if let Some(last) = stats.last_session {
        println!("Last session: {}", last.format("%Y-%m-%d %H:%M UTC"));
    }
    for record in history.records.iter().rev().take(limit) {
        println!(
            "  {}  {:<10} {:>5.1} min  {:>3} cycles  {}",
            record.completed_at.format("%Y-%m-%d %H:%M"),
            record.technique_id,
            record.duration_minutes(),
            record.cycles,
            if record.completed { "completed" } else { "stopped" }
        );
    }
    Ok(())
}

fn preview(
    config: &BreathlineConfig,
    profile: AmbienceProfile,
    out: &std::path::Path,
    seconds: f32,
    volume: f32,
    sample_rate: u32,
) -> anyhow::Result<()> {
    let Some(recipe) = profile.recipe() else {
        anyhow::bail!("profile '{profile}' is silence; nothing to render");
    };
    if !(seconds.is_finite() && seconds > 0.0) {
        anyhow::bail!("preview length must be positive, got {seconds}");
    }
    let mut graph = SignalGraph::build(
        &recipe,
        sample_rate,
        config.ambience.noise_buffer_secs,
        MasterGain::new(clamp_volume(volume)),
        &mut StdRng::from_entropy(),
    );
    let len = (seconds * sample_rate as f32).round() as usize;
    let samples = render_to_vec(&mut graph, len);
    write_wav_mono(out, &samples, sample_rate)?;
    println!(
        "Wrote {seconds}s of {profile} ambience to {}",
        out.display()
    );
    Ok(())
}
