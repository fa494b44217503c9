//! Battlemap Player - headless console client.

use std::path::Path;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use battlemap_player::console::{self, Command};
use battlemap_player::infrastructure::WebSocketConnector;
use battlemap_player::{ClientConfig, Session, SessionHandle};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "battlemap_player=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Battlemap Player");

    let config = ClientConfig::from_env()?;
    tracing::info!(
        url = %config.server_url,
        correlation = %config.correlation,
        "Configuration loaded"
    );

    let (mut session, handle) = Session::new(&config, Box::new(WebSocketConnector::new()));
    session.connect();

    let printer = tokio::spawn(print_updates(handle.clone()));
    let session_task = tokio::spawn(session.run());

    read_commands(handle).await?;

    printer.abort();
    session_task.await?;
    tracing::info!("Battlemap Player stopped");
    Ok(())
}

/// Load `.env.local` then `.env` from the working directory, if present.
fn load_dotenv() {
    for name in [".env.local", ".env"] {
        let path = Path::new(name);
        if path.exists() {
            if let Err(e) = dotenvy::from_path(path) {
                eprintln!("Failed to load {name}: {e}");
            }
        }
    }
}

async fn read_commands(handle: SessionHandle) -> anyhow::Result<()> {
    println!("{}", console::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match console::parse_command(&line) {
            Ok(None) => {}
            Ok(Some(Command::Intent(intent))) => handle.send(intent)?,
            Ok(Some(Command::Status)) => {
                println!("link: {}", console::describe_status(&handle.status()));
                println!("{}", console::describe_state(&handle.state()));
            }
            Ok(Some(Command::Help)) => println!("{}", console::HELP),
            Ok(Some(Command::Quit)) => break,
            Err(e) => println!("error: {e:#}"),
        }
    }
    Ok(())
}

async fn print_updates(handle: SessionHandle) {
    let mut state_rx = handle.watch_state();
    let mut status = handle.watch_status();
    let mut seen = state_rx.borrow().log_total;

    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = state_rx.borrow_and_update().clone();
                for line in console::new_log_lines(&state, seen) {
                    println!("{line}");
                }
                seen = state.log_total;
            }
            link = status.changed() => match link {
                Some(link) => println!("link: {}", console::describe_status(&link)),
                None => break,
            },
        }
    }
}
