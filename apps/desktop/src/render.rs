//! Plain-text rendering of the session for the terminal client.

use chrono::{DateTime, Utc};
use client_core::{RelativeTimeLabels, SessionController};
use shared::domain::{SessionPhase, Side};

const SCREEN_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Pair,
    Leave,
    Quit,
    Say(&'a str),
}

pub fn parse_command(line: &str) -> Command<'_> {
    match line.trim() {
        "/pair" | "/start" => Command::Pair,
        "/leave" | "/unpair" => Command::Leave,
        "/quit" | "/exit" => Command::Quit,
        _ => Command::Say(line),
    }
}

/// Whole screen, oldest message first, so the newest entry is always the
/// last line printed.
pub fn render_screen(
    controller: &SessionController,
    now: DateTime<Utc>,
    labels: RelativeTimeLabels,
) -> Vec<String> {
    let mut lines = Vec::new();
    match controller.phase() {
        SessionPhase::Idle => {
            lines.push("Type /pair to find someone to chat with.".to_string());
        }
        SessionPhase::Pairing => {
            lines.push("Looking for someone to chat with... (/leave to cancel)".to_string());
        }
        SessionPhase::Paired | SessionPhase::Ended => {
            lines.push("Connected, start chatting! (/leave to exit)".to_string());
            for entry in controller.project_for_display(now, labels) {
                lines.push(match entry.side {
                    Side::Peer => format!("{}  ({})", entry.text, entry.time_label),
                    Side::Local => format!(
                        "{:>width$}",
                        format!("({})  {}", entry.time_label, entry.text),
                        width = SCREEN_WIDTH
                    ),
                });
            }
            if controller.peer_left() {
                lines.push("Your partner left. Type /leave to go back.".to_string());
            }
        }
    }
    lines
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
