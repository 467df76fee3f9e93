mod lesson;
mod terminal;

use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use clap::{Parser, Subcommand};
use glowbit_core::{
    raster, AppConfig, EventName, GlowbitError, Rgb, RunStatus, RuntimeSession, DISPLAY_SIZE,
};
use tracing_subscriber::EnvFilter;

use crate::{lesson::Lesson, terminal::TerminalSink};

fn main() -> glowbit_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            lesson,
            duration_ms,
            presses,
            fast,
        } => run_lesson(config, &lesson, Duration::from_millis(duration_ms), presses, fast),
        Commands::Scroll { text, color, fast } => run_scroll(config, &text, color, fast),
        Commands::Icons => {
            print_icons();
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> glowbit_core::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading config");
            AppConfig::load(path)
        }
        None => Ok(AppConfig::default()),
    }
}

fn run_lesson(
    config: AppConfig,
    path: &Path,
    limit: Duration,
    presses: Vec<Press>,
    fast: bool,
) -> glowbit_core::Result<()> {
    tracing::info!(?path, presses = presses.len(), fast, "running lesson");
    let lesson = Lesson::load(path)?;

    let mut session = RuntimeSession::new(config)?.with_render_sink(TerminalSink::stdout(!fast));
    if session.run(&lesson) == RunStatus::Failed {
        return Err(GlowbitError::msg("lesson failed during start-up"));
    }
    drive(&mut session, presses, limit, fast);
    session.stop();
    Ok(())
}

fn run_scroll(
    config: AppConfig,
    text: &str,
    color: Option<Rgb>,
    fast: bool,
) -> glowbit_core::Result<()> {
    let mut session = RuntimeSession::new(config)?.with_render_sink(TerminalSink::stdout(!fast));
    let program = |s: &mut RuntimeSession| {
        s.show_text(text, None, color, None);
        Ok::<(), GlowbitError>(())
    };
    session.run(&program);
    drive(&mut session, Vec::new(), Duration::MAX, fast);
    Ok(())
}

fn print_icons() {
    for name in raster::icon_names() {
        println!("{name}");
        let matrix = raster::icon_matrix(name);
        for y in 0..DISPLAY_SIZE as isize {
            let row: String = (0..DISPLAY_SIZE as isize)
                .map(|x| if matrix.get(x, y) { "██" } else { "··" })
                .collect();
            println!("  {row}");
        }
    }
}

/// Steps session time towards `limit`, injecting scheduled presses. Outside
/// fast mode each step waits for the matching wall-clock instant.
fn drive(session: &mut RuntimeSession, presses: Vec<Press>, limit: Duration, fast: bool) {
    let mut presses = presses;
    presses.sort_by_key(|press| press.at);
    let mut presses = presses.into_iter().peekable();
    let started = Instant::now();

    while session.now() < limit {
        if session.is_idle() && presses.peek().is_none() {
            break;
        }

        let now = session.now();
        let next = [session.next_deadline(), presses.peek().map(|p| p.at)]
            .into_iter()
            .flatten()
            .min()
            .map_or(limit, |due| due.min(limit));

        if !fast {
            let wall = started.elapsed();
            if next > wall {
                std::thread::sleep(next - wall);
            }
        }
        session.advance(next.saturating_sub(now));

        while let Some(press) = presses.next_if(|press| press.at <= session.now()) {
            tracing::info!(event = %press.event, at_ms = press.at.as_millis() as u64, "button press");
            session.trigger_event(press.event);
        }
    }

    tracing::info!(
        now_ms = session.now().as_millis() as u64,
        completed = session.history().count(),
        "session finished"
    );
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// A simulated input scheduled at a session time, written `NAME@MS`.
#[derive(Debug, Clone, Copy)]
struct Press {
    event: EventName,
    at: Duration,
}

fn parse_press(text: &str) -> Result<Press, String> {
    let (name, at) = text
        .split_once('@')
        .ok_or_else(|| format!("expected NAME@MS, got `{text}`"))?;
    let event = EventName::parse(name).ok_or_else(|| format!("unknown event `{name}`"))?;
    let ms: u64 = at
        .trim()
        .parse()
        .map_err(|err| format!("bad time `{at}`: {err}"))?;
    Ok(Press {
        event,
        at: Duration::from_millis(ms),
    })
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Glowbit 8x8 display simulator", long_about = None)]
struct Cli {
    /// JSON config file; defaults apply to anything it leaves out.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a lesson file and show its frames in the terminal.
    Run {
        /// Path to the lesson JSON.
        lesson: PathBuf,
        /// Stop after this much session time.
        #[arg(long, default_value_t = 10_000)]
        duration_ms: u64,
        /// Simulated input, e.g. `A@1200` or `shake@3000`. Repeatable.
        #[arg(long = "press", value_parser = parse_press)]
        presses: Vec<Press>,
        /// Skip wall-clock waits and run in virtual time.
        #[arg(long)]
        fast: bool,
    },
    /// Scroll a line of text across the default surface.
    Scroll {
        text: String,
        #[arg(long)]
        color: Option<Rgb>,
        #[arg(long)]
        fast: bool,
    },
    /// List the built-in icons.
    Icons,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_press_specs() {
        let press = parse_press("A@1200").unwrap();
        assert_eq!(press.event, EventName::ButtonA);
        assert_eq!(press.at, Duration::from_millis(1_200));

        assert!(parse_press("shake").is_err());
        assert!(parse_press("wobble@10").is_err());
        assert!(parse_press("B@soon").is_err());
    }

    #[test]
    fn drive_delivers_presses_in_time_order() {
        let mut session = RuntimeSession::new(AppConfig::default()).unwrap();
        let lesson = Lesson::from_json_str(
            r#"{ "on": { "A": [ { "op": "change_counter", "by": 1 } ],
                         "B": [ { "op": "change_counter", "by": 10 } ] } }"#,
        )
        .unwrap();
        session.run(&lesson);

        let presses = vec![
            parse_press("B@300").unwrap(),
            parse_press("A@100").unwrap(),
            parse_press("A@5000").unwrap(),
        ];
        drive(&mut session, presses, Duration::from_millis(1_000), true);

        assert_eq!(session.counter(), 11);
        assert_eq!(session.last_gesture(), Some(EventName::ButtonB));
        assert_eq!(session.now(), Duration::from_millis(1_000));
    }

    #[test]
    fn cli_accepts_repeated_presses() {
        let cli = Cli::parse_from([
            "glowbit", "run", "hello.json", "--press", "A@10", "--press", "B@20", "--fast",
        ]);
        match cli.command {
            Commands::Run { presses, fast, .. } => {
                assert_eq!(presses.len(), 2);
                assert!(fast);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
