//! `loopcue run`: a live session printing JSON lines.
//!
//! Stdout carries one JSON object per line, tagged by `"line"`: snapshots
//! every `--render-ms` and session events as they happen. Lines typed on
//! stdin drive the visibility gate: `hide`, `show`, anything else counts as a key press.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use loopcue_core::gate::{NoopAudio, StaticVisibility};
use loopcue_core::{
    Config, CycleLength, CycleSession, Event, Host, HostEvent, InteractionKind, Snapshot, Stride, SystemClock,
    ValidatedConfig,
};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::terminal::TerminalChannel;

#[derive(Args)]
pub struct RunArgs {
    /// Cycle length in seconds (overrides cycle.length_secs)
    #[arg(long)]
    cycle: Option<u32>,
    /// Announce only every N seconds (overrides feedback.stride_secs)
    #[arg(long)]
    stride: Option<u32>,
    /// Suppress all cues and speech
    #[arg(long)]
    muted: bool,
    /// Speak the remaining seconds instead of playing a cue
    #[arg(long)]
    speech: bool,
    /// Stop after this many seconds
    #[arg(long = "for", value_name = "SECS")]
    duration: Option<u64>,
    /// Interval between printed snapshots
    #[arg(long, default_value_t = 1000)]
    render_ms: u64,
    /// Start as if the terminal were not in the foreground
    #[arg(long)]
    background: bool,
}

#[derive(Serialize)]
#[serde(tag = "line", rename_all = "lowercase")]
enum Line<'a> {
    Snapshot(&'a Snapshot),
    Event(&'a Event),
}

fn emit(line: Line<'_>) {
    match serde_json::to_string(&line) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!(error = %e, "failed to encode output line"),
    }
}

fn parse_host_event(input: &str) -> HostEvent {
    match input.trim() {
        "hide" => HostEvent::VisibilityChanged(false),
        "show" => HostEvent::VisibilityChanged(true),
        _ => HostEvent::Interaction(InteractionKind::KeyDown),
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut validated = config.validate()?;
    if let Some(secs) = args.cycle {
        validated.cycle_length = CycleLength::from_secs(secs)?;
    }
    if let Some(secs) = args.stride {
        validated.feedback.stride = Stride::new(secs)?;
    }
    validated.feedback.muted |= args.muted;
    validated.feedback.use_speech |= args.speech;

    let channel = Arc::new(TerminalChannel::new(config.feedback.speech_program.as_deref()));
    let host = Host {
        clock: Arc::new(SystemClock),
        visibility: Arc::new(StaticVisibility(!args.background)),
        audio: Arc::new(NoopAudio),
        permissions: Arc::new(NoopAudio),
        feedback: channel,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;
    let result = runtime.block_on(drive(args, validated, host));
    // The stdin reader sits on a blocking thread until the next line.
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}

async fn drive(
    args: RunArgs,
    config: ValidatedConfig,
    host: Host,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = CycleSession::new(&config, host);
    let mut events = session.subscribe();
    session.start()?;
    // Launching the command is the user's gesture.
    session.handle(HostEvent::Interaction(InteractionKind::KeyDown)).await;

    let mut render = tokio::time::interval(Duration::from_millis(args.render_ms.max(1)));
    let deadline = tokio::time::sleep(Duration::from_secs(args.duration.unwrap_or(u64::MAX)));
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                debug!("interrupted");
                break;
            }
            _ = &mut deadline => break,
            _ = render.tick() => emit(Line::Snapshot(&session.snapshot())),
            event = events.recv() => match event {
                Ok(event) => emit(Line::Event(&event)),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event output lagged"),
                Err(RecvError::Closed) => break,
            },
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => session.handle(parse_host_event(&line)).await,
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!(error = %e, "stdin closed");
                    stdin_open = false;
                }
            },
        }
    }

    session.stop();
    while let Ok(event) = events.try_recv() {
        emit(Line::Event(&event));
    }
    Ok(())
}
