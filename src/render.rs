//! Terminal front end: command parsing and frame rendering
//!
//! Stands in for the graphical dashboard. Lines typed on stdin become user
//! actions; frames from the session are drawn to stdout. The theme lives
//! here and never reaches the session.

use crate::config::RenderFormat;
use crate::runtime::{Frame, RenderEvent};
use crate::state_machine::{Author, InteractionMode, UserAction, AFFIRM_LABEL, DENY_LABEL};
use crossterm::style::{Color, Stylize};
use std::fmt::Write;

/// A parsed line of terminal input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Action(UserAction),
    ToggleTheme,
    Help,
    Quit,
    /// Not a recognized command; the message says why
    Invalid(String),
}

/// Parse one input line. `/pick <n>` is resolved against the options of
/// the current mode so the action always carries the option's value. A
/// leading `//` sends the line as text with one slash removed.
pub fn parse_command(line: &str, mode: &InteractionMode) -> Command {
    let trimmed = line.trim();
    if trimmed.starts_with("//") {
        return Command::Action(UserAction::SubmitText {
            text: line.replacen("//", "/", 1),
        });
    }
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Command::Action(UserAction::SubmitText {
            text: line.to_string(),
        });
    };

    let (cmd, arg) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(c, a)| (c, a.trim()));

    match cmd {
        "yes" | "y" => Command::Action(UserAction::Confirm { answer: true }),
        "no" | "n" => Command::Action(UserAction::Confirm { answer: false }),
        "pick" | "p" if arg.is_empty() => Command::Invalid("usage: /pick <option or number>".to_string()),
        "pick" | "p" => {
            let option = match (&arg.parse::<usize>(), mode) {
                (Ok(n), InteractionMode::SingleSelect { options }) => options
                    .nth(*n)
                    .map_or_else(|| arg.to_string(), str::to_string),
                _ => arg.to_string(),
            };
            Command::Action(UserAction::SelectOption { option })
        }
        "attach" | "a" if arg.is_empty() => Command::Invalid("usage: /attach <file name>".to_string()),
        "attach" | "a" => Command::Action(UserAction::AttachFile {
            name: arg.to_string(),
        }),
        "theme" => Command::ToggleTheme,
        "help" | "h" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => Command::Invalid(format!(
            "unknown command /{other}, try /help (start with // to send it as text)"
        )),
    }
}

pub const HELP: &str = "\
Type a message and press enter to send it. Start it with // to send a
leading slash.
  /yes, /no            answer a confirmation
  /pick <option|n>     choose an option
  /attach <name>       send a file
  /theme               toggle dark mode
  /quit                leave";

/// Presentation-only toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Theme {
    pub dark: bool,
}

impl Theme {
    pub fn toggle(&mut self) {
        self.dark = !self.dark;
    }

    fn system_color(self) -> Color {
        if self.dark {
            Color::White
        } else {
            Color::DarkGrey
        }
    }
}

/// Draws render events as text. Transcript and log are append-only, so
/// only what is new since the last frame is printed.
pub struct TerminalRenderer {
    pub theme: Theme,
    format: RenderFormat,
    shown_entries: usize,
    shown_log: usize,
    mode: InteractionMode,
}

impl TerminalRenderer {
    pub fn new(theme: Theme, format: RenderFormat) -> Self {
        Self {
            theme,
            format,
            shown_entries: 0,
            shown_log: 0,
            mode: InteractionMode::FreeText,
        }
    }

    /// Mode of the last rendered frame
    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    pub fn render(&mut self, event: &RenderEvent) -> String {
        if self.format == RenderFormat::Json {
            if let RenderEvent::Frame(frame) = event {
                self.track(frame);
            }
            return serde_json::to_string(event).unwrap_or_default();
        }

        match event {
            RenderEvent::Frame(frame) => self.render_frame(frame),
            RenderEvent::ClearInput => String::new(),
            RenderEvent::Rejected { silent: true, .. } => String::new(),
            RenderEvent::Rejected { reason, .. } => format!("{}", format!("! {reason}").red()),
        }
    }

    fn track(&mut self, frame: &Frame) {
        self.shown_entries = frame.transcript.entries.len();
        self.shown_log = frame.transcript.log.len();
        self.mode = frame.mode.clone();
    }

    fn render_frame(&mut self, frame: &Frame) -> String {
        let mut out = String::new();

        for entry in frame.transcript.entries.iter().skip(self.shown_entries) {
            let line = match entry.author {
                Author::User => format!("{:>60}", entry.content).with(Color::Blue).to_string(),
                Author::System => entry
                    .content
                    .as_str()
                    .with(self.theme.system_color())
                    .to_string(),
            };
            let _ = writeln!(out, "{line}");
        }

        for line in frame.transcript.log.iter().skip(self.shown_log) {
            let _ = writeln!(out, "{}", format!("  [log] {line}").dim());
        }

        if frame.awaiting_reply {
            let _ = writeln!(out, "{}", "  ...".dim());
        } else if frame.mode != self.mode || frame.mode.is_structured() {
            out.push_str(&prompt_hint(&frame.mode));
        }

        self.track(frame);
        out
    }
}

fn prompt_hint(mode: &InteractionMode) -> String {
    match mode {
        InteractionMode::FreeText => String::new(),
        InteractionMode::Confirmation => {
            format!("  [/yes = {AFFIRM_LABEL}] [/no = {DENY_LABEL}]\n")
        }
        InteractionMode::SingleSelect { options } => {
            let mut out = String::new();
            for (idx, option) in options.as_slice().iter().enumerate() {
                let _ = write!(out, "  [{}] {option}", idx + 1);
            }
            out.push('\n');
            out
        }
    }
}
