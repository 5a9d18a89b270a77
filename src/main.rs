//! Vocalink command-line front end

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vocalink::app::{self, AppState};
use vocalink::audio::CpalDevice;
use vocalink::config::{AppConfig, Cli, Command};
use vocalink::flows::{self, catalog, FormClient, PhraseClient, Selection};
use vocalink::session::CaptureSession;
use vocalink::socket::SocketConnection;
use vocalink::ui::{CommandPlayer, OutputPanel, TerminalPanel};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vocalink=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config).with_overrides(&cli).validate()?;
    tracing::debug!("Vocalink v{} with {:?}", env!("CARGO_PKG_VERSION"), config);

    match cli.command {
        Command::Devices => {
            for device in CpalDevice::list_devices() {
                println!("{}", device);
            }
            Ok(())
        }
        Command::Catalog => {
            println!("Sentences:");
            for sentence in catalog::SENTENCES {
                println!("  {} ({})", sentence, catalog::sentence_id(sentence));
            }
            println!("Languages:");
            for language in catalog::LANGUAGES {
                println!("  {}", language);
            }
            Ok(())
        }
        Command::Phrase { sentence, language } => {
            run_phrase(&config, Selection { sentence, language }).await
        }
        Command::Submit { fields } => run_submit(&config, &fields).await,
        Command::Live => run_live(&config).await,
    }
}

async fn run_phrase(config: &AppConfig, selection: Selection) -> anyhow::Result<()> {
    let base = flows::base_url(&config.server_url).map_err(anyhow::Error::msg)?;
    let client = PhraseClient::new(reqwest::Client::new(), base);
    let mut player = CommandPlayer::new(config.player.clone());
    let mut panel = TerminalPanel;

    if let Err(e) = client.show(&selection, &mut panel, &mut player).await {
        tracing::warn!("Phrase lookup failed: {}", e);
    }
    player.wait();
    Ok(())
}

async fn run_submit(config: &AppConfig, fields: &[(String, String)]) -> anyhow::Result<()> {
    let base = flows::base_url(&config.server_url).map_err(anyhow::Error::msg)?;
    let client = FormClient::new(reqwest::Client::new(), base);
    let mut player = CommandPlayer::new(config.player.clone());
    let mut panel = TerminalPanel;

    if let Err(e) = client.submit(fields, &mut panel, &mut player).await {
        tracing::warn!("Submission failed: {}", e);
    }
    player.wait();
    Ok(())
}

async fn run_live(config: &AppConfig) -> anyhow::Result<()> {
    let mut connection = SocketConnection::connect(&config.socket_url, config.engine_version())
        .await
        .context("transcription server unreachable")?;

    let sink = Arc::new(connection.client.clone());
    let state = AppState::new(CaptureSession::new(CpalDevice::new(), sink, config.audio()));
    let mut panel = TerminalPanel;

    println!("Commands: start, stop, status, quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            Some(text) = connection.transcripts.recv() => {
                let shown = app::receive_transcript(&state, text).await;
                panel.append_line(&shown);
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "start" => {
                        if let Err(e) = app::start_capture(&state).await {
                            panel.set_text(&format!("Error accessing microphone: {}", e));
                        }
                    }
                    "stop" => {
                        app::stop_capture(&state).await.map_err(anyhow::Error::msg)?;
                    }
                    "status" => {
                        let status = app::get_status(&state).await.map_err(anyhow::Error::msg)?;
                        panel.set_text(&format!(
                            "{} (start {}, stop {}, {} transcript line(s))",
                            status.status,
                            if status.controls.start_enabled { "enabled" } else { "disabled" },
                            if status.controls.stop_enabled { "enabled" } else { "disabled" },
                            status.transcript_lines
                        ));
                    }
                    "quit" | "exit" => break,
                    "" => {}
                    other => tracing::warn!("Unknown command '{}'", other),
                }
            }
        }
    }

    app::stop_capture(&state).await.map_err(anyhow::Error::msg)?;
    connection.shutdown();
    Ok(())
}
