use std::{io::Write, path::PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use client_core::{LabelLocale, RelativeTimeLabels, SessionController, SessionUpdate, WsChannel};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use render::Command;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    server_url: Option<String>,
    /// `en` or `zh-TW`.
    #[arg(long)]
    locale: Option<String>,
    #[arg(long, default_value = config::CONFIG_FILE)]
    config: PathBuf,
}

enum Input {
    Line(std::io::Result<Option<String>>),
    Update(SessionUpdate),
}

fn print_screen(controller: &SessionController, labels: RelativeTimeLabels) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", "-".repeat(60))?;
    for line in render::render_screen(controller, Utc::now(), labels) {
        writeln!(stdout, "{line}")?;
    }
    stdout.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = config::load_settings_from(&args.config, |key| std::env::var(key).ok());
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    if let Some(raw) = args.locale {
        settings.locale =
            LabelLocale::parse(&raw).with_context(|| format!("unsupported locale: {raw}"))?;
    }
    let labels = RelativeTimeLabels::new(settings.locale);

    let channel = WsChannel::connect(&settings.server_url, settings.handshake_timeout())
        .await
        .with_context(|| format!("failed to connect to {}", settings.server_url))?;
    let mut controller = SessionController::new(channel);
    info!(local_id = %controller.local_id(), "ready");
    print_screen(&controller, labels)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let input = tokio::select! {
            line = lines.next_line() => Input::Line(line),
            update = controller.next_update() => Input::Update(update),
        };

        let update = match input {
            Input::Update(update) => update,
            Input::Line(line) => {
                let Some(line) = line.context("failed to read stdin")? else {
                    controller.unpair();
                    break;
                };
                match render::parse_command(&line) {
                    Command::Pair => controller.start_pairing(),
                    Command::Leave => controller.unpair(),
                    Command::Quit => {
                        controller.unpair();
                        break;
                    }
                    // The compose line is consumed even when nothing is sent.
                    Command::Say(text) => controller.send_message(text),
                }
            }
        };

        if update.is_change() {
            print_screen(&controller, labels)?;
        }
    }

    Ok(())
}
