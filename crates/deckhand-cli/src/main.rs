use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use clap::{Parser, Subcommand};
use deckhand_contracts::actions::Action;
use deckhand_contracts::host::memory::MemorySession;
use deckhand_contracts::host::Frame;
use deckhand_contracts::payload::PNG_URI_PREFIX;
use deckhand_contracts::status::{StatusLevel, StatusLog, StatusSink};
use deckhand_engine::config::ServiceConfig;
use deckhand_engine::SlideAssistant;

#[derive(Debug, Parser)]
#[command(name = "deckhand", version, about = "Slide image assistant CLI")]
struct Cli {
    /// Append status signals to this JSONL file.
    #[arg(long, global = true)]
    events: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a vector icon from a description and add it to the deck.
    Generate(GenerateArgs),
    /// Fetch a company logo and add it to the deck.
    Logo(LogoArgs),
    /// Remove the background of a picture, replacing it in place.
    RemoveBackground(RemoveBackgroundArgs),
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[arg(long)]
    prompt: String,
}

#[derive(Debug, Parser)]
struct LogoArgs {
    #[arg(long)]
    name: String,
}

#[derive(Debug, Parser)]
struct RemoveBackgroundArgs {
    /// Image file seeded onto the deck as the selected picture.
    #[arg(long)]
    image: PathBuf,
}

const SEED_FRAME: Frame = Frame {
    x: 100.0,
    y: 100.0,
    width: 240.0,
    height: 180.0,
};

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("deckhand error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let session = Arc::new(MemorySession::new());
    let log = cli.events.as_deref().map(StatusLog::new);
    let sink = Arc::new(ConsoleSink::new(log.clone()));

    let (action, input) = match &cli.command {
        Command::Generate(args) => (Action::GenerateIcon, args.prompt.clone()),
        Command::Logo(args) => (Action::FetchLogo, args.name.clone()),
        Command::RemoveBackground(args) => {
            seed_selected_picture(session.as_ref(), &args.image)?;
            (Action::RemoveBackground, String::new())
        }
    };

    let assistant = SlideAssistant::new(session.clone(), sink, ServiceConfig::from_env());
    let outcome = assistant.run(action, &input);

    if let Some(log) = &log {
        eprintln!("status log: {} (run {})", log.path().display(), log.run_id());
    }
    println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    Ok(if outcome.is_success() { 0 } else { 1 })
}

/// Prints engine signals to stderr and tees them into an optional JSONL
/// status log.
struct ConsoleSink {
    log: Option<StatusLog>,
}

impl ConsoleSink {
    fn new(log: Option<StatusLog>) -> Self {
        Self { log }
    }
}

impl StatusSink for ConsoleSink {
    fn set_busy(&self, action: Action, busy: bool) {
        if busy {
            eprintln!("[{}] working...", action.name());
        }
        if let Some(log) = &self.log {
            log.set_busy(action, busy);
        }
    }

    fn show(
        &self,
        action: Action,
        level: StatusLevel,
        message: &str,
        revert_after: Option<Duration>,
    ) {
        eprintln!("[{}] {}: {message}", action.name(), level.label());
        if let Some(log) = &self.log {
            log.show(action, level, message, revert_after);
        }
    }

    fn clear_input(&self, action: Action) {
        if let Some(log) = &self.log {
            log.clear_input(action);
        }
    }
}

/// Loads an image file onto a fresh deck and selects it, standing in for a
/// live host selection. Any decodable raster is accepted and recoded as
/// PNG, the only raster form the in-memory host takes.
fn seed_selected_picture(session: &MemorySession, path: &Path) -> Result<()> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read image {}", path.display()))?;
    let decoded = image::load_from_memory(&bytes)
        .with_context(|| format!("{} is not a decodable image", path.display()))?;
    let mut png = Vec::new();
    decoded.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;

    let uri = format!("{PNG_URI_PREFIX}{}", BASE64.encode(&png));
    let id = session.insert_picture(SEED_FRAME, &uri)?;
    session.select(&[id]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Cursor;

    use deckhand_contracts::host::ShapeKind;
    use deckhand_contracts::status::STATUS_REVERT_DELAY;
    use serde_json::Value;

    use super::*;

    #[test]
    fn cli_parses_the_three_commands() {
        let cli = Cli::try_parse_from(["deckhand", "generate", "--prompt", "a blue circle"])
            .expect("generate parses");
        assert!(matches!(cli.command, Command::Generate(_)));

        let cli = Cli::try_parse_from(["deckhand", "logo", "--name", "Acme", "--events", "s.jsonl"])
            .expect("logo parses with the global flag");
        assert_eq!(cli.events.as_deref(), Some(Path::new("s.jsonl")));
        match cli.command {
            Command::Logo(args) => assert_eq!(args.name, "Acme"),
            other => panic!("expected logo, got {other:?}"),
        }

        let cli = Cli::try_parse_from(["deckhand", "remove-background", "--image", "in.png"])
            .expect("remove-background parses");
        assert!(matches!(cli.command, Command::RemoveBackground(_)));
    }

    #[test]
    fn seeded_picture_lands_selected_on_a_fresh_deck() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("input.png");
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        fs::write(&path, &bytes)?;

        let session = MemorySession::new();
        seed_selected_picture(&session, &path)?;

        let deck = session.snapshot();
        assert_eq!(deck.slides.len(), 1);
        assert_eq!(deck.selection.len(), 1);
        let shape = &deck.slides[0].shapes[0];
        assert_eq!(shape.kind, ShapeKind::Picture);
        assert_eq!(shape.frame, SEED_FRAME);
        assert!(shape
            .uri
            .as_deref()
            .unwrap_or("")
            .starts_with(PNG_URI_PREFIX));
        Ok(())
    }

    #[test]
    fn console_sink_tees_signals_into_the_status_log() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("status.jsonl");
        let log = StatusLog::with_run_id(&path, "run-cli");
        let sink = ConsoleSink::new(Some(log.clone()));

        sink.set_busy(Action::FetchLogo, true);
        sink.show(
            Action::FetchLogo,
            StatusLevel::Success,
            "✓ Logo added to slide!",
            Some(STATUS_REVERT_DELAY),
        );
        sink.clear_input(Action::FetchLogo);
        sink.set_busy(Action::FetchLogo, false);

        // The log advertises where it writes and under which run id.
        assert_eq!(log.path(), path);
        let content = fs::read_to_string(log.path())?;
        let lines: Vec<Value> = content
            .lines()
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?;
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["type"], "busy");
        assert_eq!(lines[1]["message"], "✓ Logo added to slide!");
        assert_eq!(lines[2]["type"], "input_cleared");
        for line in &lines {
            assert_eq!(line["action"], "logo");
            assert_eq!(line["run_id"], log.run_id());
        }
        Ok(())
    }
}
