use anyhow::{Context, Result};
use clap::Parser;
use lingo_voice::{
    session, Config, ConnectConfig, Lesson, LessonContent, SessionConfig, VoiceTutorSession,
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "lingo-voice", about = "Voice-tutor session core for lingosocial")]
struct Args {
    /// Config file (without extension)
    #[arg(long, default_value = "config/lingo-voice")]
    config: String,

    /// Lesson JSON to ground the tutor with; a small built-in lesson is
    /// used when omitted
    #[arg(long)]
    lesson: Option<std::path::PathBuf>,

    /// Language the student is practicing
    #[arg(long, default_value = "Spanish")]
    language: String,

    /// Actually connect to the tutor endpoint (requires GEMINI_API_KEY)
    #[arg(long)]
    connect: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v0.1.0", cfg.service.name);
    info!(
        "Audio: capture {}Hz / {} samples per frame, playback {}Hz",
        cfg.audio.capture_sample_rate, cfg.audio.frame_samples, cfg.audio.playback_sample_rate
    );
    info!("Tutor: model {} voice {}", cfg.tutor.model, cfg.tutor.voice);

    let lesson = match &args.lesson {
        Some(path) => Lesson::load(path)?,
        None => sample_lesson(&args.language),
    };
    info!("Lesson: {}", lesson.title);

    if !args.connect {
        info!("Dry run complete; pass --connect to start a live session");
        return Ok(());
    }

    let api_key = std::env::var("GEMINI_API_KEY")
        .context("GEMINI_API_KEY must be set for a live session")?;

    let session_config = SessionConfig {
        target_language: args.language.clone(),
        voice: cfg.tutor.voice.clone(),
        capture_sample_rate: cfg.audio.capture_sample_rate,
        playback_sample_rate: cfg.audio.playback_sample_rate,
        frame_samples: cfg.audio.frame_samples,
        ..SessionConfig::default()
    };

    let connect_config = ConnectConfig {
        endpoint: cfg.tutor.endpoint.clone(),
        api_key,
        model: cfg.tutor.model.clone(),
        voice: cfg.tutor.voice.clone(),
        system_instruction: session::system_instruction(
            &cfg.tutor.voice,
            &args.language,
            &lesson,
        ),
    };

    let tutor = VoiceTutorSession::connect(session_config, connect_config)
        .await
        .context("Failed to start voice session")?;

    info!("Session live; press Ctrl-C to end practice");

    // Print status transitions and the transcript as they happen.
    let mut status_rx = tutor.subscribe_status();
    let watcher = {
        let status_rx_inner = status_rx.clone();
        tokio::spawn(async move {
            let mut status_rx = status_rx_inner;
            while status_rx.changed().await.is_ok() {
                let status = *status_rx.borrow();
                info!("Session status: {}", status.as_str());
                if status.is_terminal() {
                    break;
                }
            }
        })
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Exit requested");
        }
        _ = status_rx.wait_for(|s| s.is_terminal()) => {
            info!("Session ended remotely");
        }
    }

    let transcript = tutor.transcript();
    if !transcript.is_empty() {
        info!("Tutor said: {}", transcript.tutor);
        info!("You said: {}", transcript.student);
    }

    tutor.shutdown().await;
    watcher.abort();

    let stats = tutor.stats();
    info!(
        "Practice over after {:.1}s: {} frames sent ({} dropped), {} chunks played, {} interruptions",
        stats.duration_secs,
        stats.frames_sent,
        stats.frames_dropped,
        stats.chunks_scheduled,
        stats.interruptions
    );

    Ok(())
}

/// A tiny built-in lesson so the binary can run without the lesson service.
fn sample_lesson(language: &str) -> Lesson {
    Lesson {
        id: "sample-cafe".to_string(),
        title: format!("At the café ({})", language),
        description: "Ordering a drink and making small talk".to_string(),
        content: LessonContent {
            vocabulary: vec![
                lingo_voice::VocabEntry {
                    word: "el café".to_string(),
                    translation: "the coffee".to_string(),
                    pronunciation: "el ka-FEH".to_string(),
                },
                lingo_voice::VocabEntry {
                    word: "la cuenta".to_string(),
                    translation: "the bill".to_string(),
                    pronunciation: "la KWEN-ta".to_string(),
                },
            ],
            phrases: Vec::new(),
            dialogue: Vec::new(),
            story: Some(vec![lingo_voice::lesson::StoryParagraph {
                text: "Ana entra en el café y pide un café con leche.".to_string(),
                translation: "Ana enters the café and orders a latte.".to_string(),
            }]),
            cultural_note: String::new(),
        },
    }
}
