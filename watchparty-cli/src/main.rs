use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Input;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use watchparty::model::IceServerConfig;
use watchparty::peer::{DirectoryClient, SessionConfig, SessionEvent, begin_session};
use watchparty::relay::{RegistryConfig, RelayConfig, serve};
use watchparty::{RoomToken, SessionRole};

#[derive(Parser)]
#[command(name = "watchparty", version, about = "Peer-to-peer watch parties")]
struct Cli {
    /// Relay base URL used by `host` and `join`.
    #[arg(
        long,
        global = true,
        env = "WATCHPARTY_RELAY_URL",
        default_value = "ws://127.0.0.1:3000"
    )]
    relay_url: String,

    /// STUN/TURN urls; the public STUN pool when empty.
    #[arg(
        long = "ice-server",
        global = true,
        env = "WATCHPARTY_ICE_SERVERS",
        value_delimiter = ','
    )]
    ice_servers: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay and room directory.
    Relay {
        #[arg(long, env = "WATCHPARTY_BIND", default_value = "0.0.0.0:3000")]
        bind: SocketAddr,

        /// Seconds a created room waits for its first member.
        #[arg(long, env = "WATCHPARTY_RESERVATION_TTL", default_value_t = 600)]
        reservation_ttl: u64,
    },
    /// Create a room and start a party in it.
    Host {
        #[arg(long, env = "WATCHPARTY_TOKEN")]
        token: Option<String>,

        /// What everyone should be watching; sent to each guest on join.
        #[arg(long, env = "WATCHPARTY_CONTENT_URL")]
        content_url: Option<String>,
    },
    /// Join an existing party.
    Join { token: Option<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut session = SessionConfig {
        relay_url: cli.relay_url,
        ..SessionConfig::default()
    };
    if !cli.ice_servers.is_empty() {
        session.ice_servers = vec![IceServerConfig {
            urls: cli.ice_servers,
            username: None,
            credential: None,
        }];
    }

    match cli.command {
        Commands::Relay {
            bind,
            reservation_ttl,
        } => {
            let config = RelayConfig {
                bind,
                registry: RegistryConfig {
                    reservation_ttl: Duration::from_secs(reservation_ttl),
                    ..RegistryConfig::default()
                },
            };
            println!("{}", format!("Relay starting on {}", bind).green().bold());
            serve(config).await
        }

        Commands::Host { token, content_url } => {
            let room = match token {
                Some(raw) => RoomToken::parse(&raw).context("Room token must not be empty")?,
                None => RoomToken::generate(),
            };
            let directory = DirectoryClient::for_relay(&session.relay_url)?;
            directory
                .create_room(&room, content_url.as_deref())
                .await
                .with_context(|| format!("Failed to create room {}", room))?;

            println!(
                "{} {}",
                "Party created, share this token:".green().bold(),
                room.to_string().yellow().bold()
            );
            if let Some(url) = &content_url {
                println!("{} {}", "Watching:".green(), url.underline());
            }
            run_session(&session, room, SessionRole::Host).await
        }

        Commands::Join { token } => {
            let raw = match token {
                Some(raw) => raw,
                None => Input::<String>::new()
                    .with_prompt("Room token")
                    .interact_text()
                    .context("Failed to read room token")?,
            };
            let room = RoomToken::parse(&raw).context("Room token must not be empty")?;
            let directory = DirectoryClient::for_relay(&session.relay_url)?;
            let content_url = directory
                .join_room(&room)
                .await
                .with_context(|| format!("Failed to join room {}", room))?;
            match content_url {
                Some(url) => println!("{} {}", "The host is watching:".green(), url.underline()),
                None => println!("{}", "The host did not share what they are watching.".dimmed()),
            }

            run_session(&session, room, SessionRole::Guest).await
        }
    }
}

async fn run_session(config: &SessionConfig, room: RoomToken, role: SessionRole) -> Result<()> {
    let (handle, mut events) = begin_session(config, room.clone(), role, None)
        .await
        .context("Failed to start session")?;
    info!("Session for room {} started", room);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let ended = matches!(event, SessionEvent::Ended);
                print_event(&event);
                if ended {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "Leaving the party...".cyan());
                handle.end().await?;
            }
        }
    }

    Ok(())
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::Joined { local_id } => {
            println!("{} {}", "Joined as".green(), local_id.to_string().bold());
        }
        SessionEvent::PeerPhase { remote, phase } => {
            println!("  {} {} {}", "peer".dimmed(), remote, phase.to_string().cyan());
        }
        SessionEvent::PeerFailed { remote, reason } => {
            println!("  {} {}: {}", "peer failed".red(), remote, reason);
        }
        SessionEvent::RemoteTrack {
            remote,
            track_id,
            kind,
        } => {
            println!("  {} {} from {} ({})", "receiving".green(), kind, remote, track_id);
        }
        SessionEvent::PeerLeft { remote } => {
            println!("{} {}", "Left:".yellow(), remote);
        }
        SessionEvent::SyncMedia { sender, payload } => {
            let sender = sender
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "?".to_owned());
            println!("  {} {} {}", "sync".magenta(), sender, payload);
        }
        SessionEvent::HostLeft { .. } => {
            println!("{}", "The host left, the party has ended.".red().bold());
        }
        SessionEvent::Ended => {
            println!("{}", "Session ended.".green());
        }
    }
}
