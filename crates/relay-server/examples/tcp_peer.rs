//! Interactive TCP peer for poking at a running hub.
//!
//! ```text
//! cargo run -p relay-server --example tcp_peer -- robot R1
//! cargo run -p relay-server --example tcp_peer -- ai stockfish-1
//! cargo run -p relay-server --example tcp_peer
//! ```
//!
//! Every line typed is sent as-is; every line the hub writes back is
//! printed with a `<<` prefix.

use std::env;

use anyhow::{bail, Context, Result};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> Result<()> {
    // Where to connect: env override or default.
    let addr = env::var("RELAY_PEER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    let mut args = env::args().skip(1);
    let identity = match (args.next(), args.next()) {
        (Some(role), Some(id)) => Some(identify_line(&role, &id)?),
        (Some(role), None) => bail!("missing id for role {:?}", role),
        _ => None,
    };

    println!("Connecting to {}...", addr);
    let stream = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("connecting to {}", addr))?;
    println!("Connected.");

    let (read_half, mut write_half) = stream.into_split();

    let printer = tokio::spawn(async move {
        let mut lines = BufReader::new(read_half).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => println!("<< {}", line),
                Ok(None) => {
                    println!("hub closed the connection");
                    break;
                }
                Err(e) => {
                    eprintln!("read error: {}", e);
                    break;
                }
            }
        }
    });

    if let Some(line) = identity {
        println!(">> {}", line);
        write_half.write_all(format!("{}\n", line).as_bytes()).await?;
    }

    println!("Type JSON lines or bare FEN, for example:");
    println!(r#"  {{"goal_id":"g1","success":true}}"#);
    println!(r#"  {{"fen_str":"rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1","move":"e2e4"}}"#);
    println!("  rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1");
    println!("Type 'quit' or 'exit' to leave.\n");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = stdin.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
            break;
        }
        if printer.is_finished() {
            break;
        }

        write_half.write_all(format!("{}\n", trimmed).as_bytes()).await?;
    }

    write_half.shutdown().await?;
    printer.abort();
    println!("Exiting peer.");
    Ok(())
}

fn identify_line(role: &str, id: &str) -> Result<String> {
    let line = match role {
        "robot" => json!({"type": "robot_identify", "robot_id": id}),
        "ai" => json!({"type": "ai_identify", "ai_id": id}),
        other => bail!("unknown role {:?}, expected robot or ai", other),
    };
    Ok(line.to_string())
}
