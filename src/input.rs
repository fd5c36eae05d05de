//! Console input handling.
//!
//! Stands in for the tray UI when running headless: each line typed on stdin
//! is mapped to a [`UiSignal`] or a local command.  Adding a new command is a
//! single match arm in [`parse_command`].

use std::sync::Arc;

use ghnotify_sync::{PollControl, PresentationBridge, SignalOutcome, UiSignal};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

pub const HELP: &str = "commands: r|refresh, l|list, d|dismiss <id>, h|hide, esc, q|quit";

/// What a line of input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Signal(UiSignal),
    List,
    Quit,
}

/// Parse one input line.  Returns `None` for blank or unknown input.
pub fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    let verb = parts.next()?;

    match verb {
        "q" | "quit" => Some(Command::Quit),
        "r" | "refresh" => Some(Command::Signal(UiSignal::ManualRefreshRequested)),
        "h" | "hide" | "blur" => Some(Command::Signal(UiSignal::WindowLostFocus)),
        "esc" | "escape" => Some(Command::Signal(UiSignal::EscapePressed)),
        "l" | "list" => Some(Command::List),
        "d" | "dismiss" => parts
            .next()
            .map(|id| Command::Signal(UiSignal::MarkDismissed(id.to_string()))),
        _ => None,
    }
}

/// Read commands from stdin until EOF or `quit`.
///
/// EOF leaves the scheduler running (e.g. stdin redirected from
/// `/dev/null`); `quit` cancels it.
pub async fn listen(bridge: Arc<PresentationBridge>, control: PollControl) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                return;
            }
        };

        let Some(command) = parse_command(&line) else {
            if !line.trim().is_empty() {
                println!("{HELP}");
            }
            continue;
        };

        match command {
            Command::Quit => {
                control.cancel();
                return;
            }
            Command::List => print_list(&bridge),
            Command::Signal(signal) => match bridge.handle_signal(signal).await {
                Ok(SignalOutcome::HideWindow) => info!("popup hidden"),
                Ok(SignalOutcome::RefreshQueued) => println!("refreshing…"),
                Ok(SignalOutcome::RefreshIgnored) => println!("refresh already in progress"),
                Ok(SignalOutcome::Dismissed { changed: true }) => println!("dismissed"),
                Ok(SignalOutcome::Dismissed { changed: false }) => {
                    println!("nothing to dismiss with that id")
                }
                Err(e) => {
                    warn!(error = %e, "signal not delivered");
                    return;
                }
            },
        }
    }
}

fn print_list(bridge: &PresentationBridge) {
    let items = bridge.list_notifications();
    println!("{} unread / {} total", bridge.unread_count(), items.len());
    for n in items {
        println!(
            "{} {:<18} {:<8} [{}] {}",
            if n.unread { "●" } else { " " },
            n.updated_at.format("%Y-%m-%d %H:%M"),
            n.id,
            n.repository.full_name,
            n.subject.title,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_aliases() {
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("  quit  "), Some(Command::Quit));
    }

    #[test]
    fn refresh_maps_to_manual_refresh() {
        assert_eq!(
            parse_command("r"),
            Some(Command::Signal(UiSignal::ManualRefreshRequested))
        );
    }

    #[test]
    fn hide_and_escape_are_distinct_signals() {
        assert_eq!(
            parse_command("hide"),
            Some(Command::Signal(UiSignal::WindowLostFocus))
        );
        assert_eq!(
            parse_command("esc"),
            Some(Command::Signal(UiSignal::EscapePressed))
        );
    }

    #[test]
    fn dismiss_requires_an_id() {
        assert_eq!(
            parse_command("d 12345"),
            Some(Command::Signal(UiSignal::MarkDismissed("12345".into())))
        );
        assert_eq!(parse_command("dismiss"), None);
    }

    #[test]
    fn blank_and_unknown_lines_are_ignored() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("   "), None);
        assert_eq!(parse_command("launch"), None);
    }

    #[test]
    fn list_command() {
        assert_eq!(parse_command("l"), Some(Command::List));
    }
}
