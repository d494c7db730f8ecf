//! Standalone client binary.
//!
//! Usage:
//!   cargo run -p client_net -- [--addr 127.0.0.1:57005] [--name Player]
//!                              [--transport udp|loopback] [--config cfg.json]
//!
//! The client connects, joins the game, and runs the tick loop: pulse the
//! transport, advance interpolation, process console input.
//!
//! Console commands:
//!   say <message>       - Send chat message
//!   w <id> <message>    - Whisper a player
//!   cmd <command>       - Send an rcon command
//!   status              - Show session status
//!   disconnect          - Disconnect from server
//!   quit                - Exit client

use std::env;
use std::io::{BufRead, Write};
use std::time::Duration;

use anyhow::Context;
use client_net::events::GameEventObserver;
use client_net::players::PlayerRecord;
use client_net::transport::default_registry;
use client_net::GameClient;
use client_shared::config::ClientConfig;
use client_shared::math::Vec3;
use client_shared::packets::PlayerId;
use tokio::sync::mpsc;
use tracing::info;

fn parse_args() -> anyhow::Result<ClientConfig> {
    let mut cfg = ClientConfig::default();
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                let raw = std::fs::read_to_string(&args[i + 1])
                    .with_context(|| format!("read config {}", args[i + 1]))?;
                cfg = ClientConfig::from_json_str(&raw).context("parse config")?;
                i += 2;
            }
            "--addr" if i + 1 < args.len() => {
                cfg.server_addr = args[i + 1].clone();
                i += 2;
            }
            "--name" if i + 1 < args.len() => {
                cfg.nickname = args[i + 1].clone();
                i += 2;
            }
            "--transport" if i + 1 < args.len() => {
                cfg.transport = args[i + 1].clone();
                i += 2;
            }
            _ => i += 1,
        }
    }
    Ok(cfg)
}

/// Prints presentation events to the terminal.
struct ConsoleObserver;

impl GameEventObserver for ConsoleObserver {
    fn on_map_change(&mut self, map_name: &str) {
        println!("Loading map: {map_name}");
    }

    fn on_local_player_joined(&mut self, player: &PlayerRecord) {
        println!("Joined the game as player {}", player.id);
    }

    fn on_player_joined(&mut self, player: &PlayerRecord) {
        println!("{} joined the game", player.name);
    }

    fn on_player_left(&mut self, _id: PlayerId, name: &str) {
        println!("{name} left the game");
    }

    fn on_player_died(&mut self, id: PlayerId) {
        println!("Player {id} died");
    }

    fn on_player_respawned(&mut self, id: PlayerId) {
        println!("Player {id} respawned");
    }

    fn on_whisper(&mut self, _sender: PlayerId, sender_name: &str, message: &str) {
        println!("[whisper] {sender_name}: {message}");
    }

    fn on_chat_message(&mut self, _sender: PlayerId, sender_name: &str, message: &str) {
        println!("{sender_name}: {message}");
    }

    fn on_server_message(&mut self, message: &str) {
        println!("[server] {message}");
    }

    fn on_rcon_response(&mut self, message: &str, is_admin: bool) {
        let prefix = if is_admin { "[rcon/admin]" } else { "[rcon]" };
        println!("{prefix} {message}");
    }

    fn on_player_position_update(&mut self, _id: PlayerId, _position: Vec3) {
        // High-rate; the renderer reads positions from the player mirror.
    }

    fn on_connection_lost(&mut self) {
        println!("Connection to server lost.");
    }

    fn on_disconnected(&mut self) {
        println!("Disconnected.");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args()?;
    info!(server = %cfg.server_addr, transport = %cfg.transport, "Starting client");

    // No transport, no client: resolution failure is fatal by design.
    let registry = default_registry();
    let transport = registry
        .create(&cfg.transport)
        .context("resolve transport")?;

    let server_addr = cfg.server_addr.clone();
    let tick_hz = cfg.tick_hz.max(1);
    let mut client = GameClient::new(transport, Box::new(ConsoleObserver), cfg);

    if !client.connect(&server_addr) {
        anyhow::bail!("could not connect to {server_addr}");
    }
    client.join_game();
    client.sync_game_time();

    // Set up console input channel.
    let (console_tx, mut console_rx) = mpsc::channel::<String>(32);

    // Spawn stdin reader thread.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("] ");
            let _ = stdout.flush();
            let mut line = String::new();
            if stdin.lock().read_line(&mut line).is_err() {
                break;
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    println!("Client connected. Type 'status' for info, 'quit' to exit.");
    println!();

    let tick_interval = Duration::from_secs_f32(1.0 / tick_hz as f32);

    loop {
        // Process console commands.
        while let Ok(line) = console_rx.try_recv() {
            exec_console(&mut client, &line);
        }

        client.pulse();
        client.advance(tick_interval);

        if !client.is_connected() {
            println!("Session ended.");
            break;
        }

        tokio::time::sleep(tick_interval).await;
    }

    Ok(())
}

fn exec_console(client: &mut GameClient, line: &str) {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((&command, rest)) = tokens.split_first() else {
        return;
    };

    match command {
        "say" => {
            client.send_chat_message(&rest.join(" "));
        }
        "w" => {
            let Some((id, message)) = rest.split_first() else {
                println!("Usage: w <id> <message>");
                return;
            };
            match id.parse() {
                Ok(id) => {
                    client.send_whisper(PlayerId(id), &message.join(" "));
                }
                Err(_) => println!("Usage: w <id> <message>"),
            }
        }
        "cmd" => {
            client.send_command(&rest.join(" "));
        }
        "status" => {
            println!("Connected: {}", client.is_connected());
            println!("In game: {}", client.is_in_game());
            if let Some(map) = client.current_map() {
                println!("Map: {map}");
            }
            println!("Players tracked: {}", client.players().len());
            println!("Ping: {:?}", client.ping());
        }
        "disconnect" => {
            client.disconnect();
        }
        "quit" | "exit" => {
            client.disconnect();
            std::process::exit(0);
        }
        _ => println!("Unknown command: {command}"),
    }
}
