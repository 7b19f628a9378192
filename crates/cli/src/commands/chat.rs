//! `localseek chat` — Interactive or single-question mode.

use localseek_agent::{Session, SessionCommand, TurnSink};
use localseek_core::SourceText;
use localseek_providers::build_from_config;
use localseek_sources::{FetchSettings, WebSourceFetcher};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::warn;

/// Flags of the `chat` subcommand.
#[derive(Debug, Default)]
pub struct ChatOptions {
    pub message: Option<String>,
    pub model: Option<String>,
    pub no_history: bool,
}

pub async fn run(
    config_path: Option<&Path>,
    options: ChatOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path)?;
    if let Some(model) = options.model {
        config.inference.model = model;
    }
    if options.no_history {
        config.history.enabled = false;
    }

    let fetcher = WebSourceFetcher::new(FetchSettings::from_config(&config.search))
        .map_err(|e| format!("Failed to set up fetching: {e}"))?;
    let provider =
        build_from_config(&config.inference).map_err(|e| format!("Failed to set up inference: {e}"))?;
    let mut session = Session::from_config(&config, Arc::new(fetcher), provider);

    match options.message {
        Some(message) => {
            let mut sink = TerminalSink::default();
            let result = session.run_turn(&message, &mut sink).await;
            println!();
            match result {
                Ok(outcome) => print!("{}", render_sources("Sources Used", &outcome.sources)),
                Err(e) => {
                    print!("{}", render_sources("Sources Checked", &sink.sources));
                    return Err(e.into());
                }
            }
        }
        None => interactive(&mut session, &config.inference.endpoint).await?,
    }

    Ok(())
}

async fn interactive(
    session: &mut Session,
    endpoint: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("  localseek — interactive mode");
    println!();
    println!("  Provider:  {} ({endpoint})", session.provider_name());
    println!("  Model:     {}", session.model());
    println!("  History:   {}", on_off(session.history().is_enabled()));
    println!();
    println!("  Ask anything, or paste a YouTube URL to summarize a video.");
    println!("  Commands: 'clear history', 'toggle history', 'history', 'exit'.");
    println!();

    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        // EOF or Ctrl+C at the prompt
        let Some(line) = line else {
            println!();
            break;
        };

        match SessionCommand::parse(&line) {
            SessionCommand::Exit => break,
            SessionCommand::Empty => continue,
            SessionCommand::ClearHistory => {
                session.clear_history();
                println!("  History cleared.\n");
            }
            SessionCommand::ToggleHistory => {
                let enabled = session.toggle_history();
                println!("  History {}.\n", if enabled { "enabled" } else { "disabled" });
            }
            SessionCommand::ShowHistory => print!("{}", render_history(session)),
            SessionCommand::Query(query) => {
                let mut sink = TerminalSink::default();
                println!();
                print!("  Assistant > ");
                std::io::stdout().flush()?;

                let result = tokio::select! {
                    result = session.run_turn(&query, &mut sink) => Some(result),
                    _ = tokio::signal::ctrl_c() => None,
                };
                println!();
                println!();

                match result {
                    Some(Ok(outcome)) => print!("{}", render_sources("Sources Used", &outcome.sources)),
                    Some(Err(e)) => {
                        eprintln!("  [Error] {e}");
                        print!("{}", render_sources("Sources Checked", &sink.sources));
                    }
                    None => eprintln!("  [Interrupted]"),
                }
                println!();
            }
        }
    }

    println!("  Goodbye!");
    Ok(())
}

/// Prints answer text as it streams and remembers which sources were used.
#[derive(Debug)]
struct TerminalSink<W: Write = std::io::Stdout> {
    out: W,
    sources: Vec<String>,
    write_failed: bool,
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> TerminalSink<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            sources: Vec::new(),
            write_failed: false,
        }
    }
}

impl<W: Write> TurnSink for TerminalSink<W> {
    fn on_sources(&mut self, sources: &[SourceText]) {
        self.sources = sources.iter().map(|s| s.origin.clone()).collect();
    }

    fn on_chunk(&mut self, chunk: &str) {
        if self.write_failed {
            return;
        }
        let written = self
            .out
            .write_all(chunk.as_bytes())
            .and_then(|()| self.out.flush());
        if let Err(e) = written {
            // Reported once; the rest of the answer is not printed
            warn!("Cannot write the answer to the terminal: {e}");
            self.write_failed = true;
        }
    }
}

fn render_sources(title: &str, sources: &[String]) -> String {
    if sources.is_empty() {
        return format!("  {title}: none\n");
    }
    let mut out = format!("  {title}:\n");
    for (i, origin) in sources.iter().enumerate() {
        out.push_str(&format!("    [{}] {origin}\n", i + 1));
    }
    out
}

fn render_history(session: &Session) -> String {
    let history = session.history();
    let mut out = format!(
        "  History: {} ({} of {} turns stored)\n",
        on_off(history.is_enabled()),
        history.len(),
        history.max_turns()
    );
    for (i, turn) in history.stored().enumerate() {
        out.push_str(&format!("    {}. {}\n", i + 1, turn.query));
    }
    out.push('\n');
    out
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_listed_in_order() {
        let out = render_sources(
            "Sources Used",
            &["https://a.example".into(), "youtube:dQw4w9WgXcQ".into()],
        );
        assert_eq!(
            out,
            "  Sources Used:\n    [1] https://a.example\n    [2] youtube:dQw4w9WgXcQ\n"
        );
    }

    #[test]
    fn no_sources() {
        assert_eq!(render_sources("Sources Checked", &[]), "  Sources Checked: none\n");
    }

    /// Fails every write, like stdout after the reader went away.
    struct ClosedPipe {
        attempts: usize,
    }

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            self.attempts += 1;
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sink_streams_chunks_to_writer() {
        let mut sink = TerminalSink::new(Vec::new());
        sink.on_chunk("The capital ");
        sink.on_chunk("is Paris.");
        assert_eq!(sink.out, b"The capital is Paris.");
        assert!(!sink.write_failed);
    }

    #[test]
    fn write_failure_is_reported_once() {
        let mut sink = TerminalSink::new(ClosedPipe { attempts: 0 });
        sink.on_chunk("one");
        sink.on_chunk("two");
        sink.on_chunk("three");
        assert!(sink.write_failed);
        assert_eq!(sink.out.attempts, 1);
    }

    #[test]
    fn sink_records_origins() {
        let mut sink = TerminalSink::default();
        sink.on_sources(&[SourceText::new("https://a.example", "x", 10)]);
        assert_eq!(sink.sources, vec!["https://a.example"]);
    }
}
