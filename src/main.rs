//! Chat dashboard - terminal front end
//!
//! Reads actions from stdin, drives one chat session and renders its
//! transcript and activity log to stdout.

use chat_dashboard::config::SessionConfig;
use chat_dashboard::render::{parse_command, Command, TerminalRenderer, Theme, HELP};
use chat_dashboard::runtime::{start_session, RenderEvent};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = SessionConfig::from_env()?;

    // Initialize logging. Stdout is the render surface, so logs go to stderr.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "chat_dashboard=info".into());
    if config.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::info!(
        reply_delay_ms = %config.reply_delay.as_millis(),
        structured_probability = config.policy.structured_probability,
        options = ?config.policy.options.as_slice(),
        seeded = config.seed.is_some(),
        "Starting chat dashboard"
    );

    let (session, task) = start_session(&config);
    let mut render_rx = session.subscribe();
    let mut renderer = TerminalRenderer::new(
        Theme {
            dark: config.dark_mode,
        },
        config.render_format,
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Chat Dashboard\n{HELP}");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_command(&line, renderer.mode()) {
                    Command::Action(action) => {
                        if session.send(action).await.is_err() {
                            break;
                        }
                    }
                    Command::ToggleTheme => {
                        renderer.theme.toggle();
                        println!("dark mode {}", if renderer.theme.dark { "on" } else { "off" });
                    }
                    Command::Help => println!("{HELP}"),
                    Command::Quit => break,
                    Command::Invalid(message) => println!("! {message}"),
                }
            }
            event = render_rx.recv() => match event {
                Ok(event) => draw(&mut renderer, &event)?,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Render sink fell behind");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    session.shutdown();
    task.await?;
    tracing::info!(session_id = %session.session_id, "Session closed");
    Ok(())
}

fn draw(renderer: &mut TerminalRenderer, event: &RenderEvent) -> std::io::Result<()> {
    let out = renderer.render(event);
    if out.is_empty() {
        return Ok(());
    }
    let mut stdout = std::io::stdout().lock();
    if out.ends_with('\n') {
        write!(stdout, "{out}")?;
    } else {
        writeln!(stdout, "{out}")?;
    }
    stdout.flush()
}
