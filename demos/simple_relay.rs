//! Simple broadcast relay example
//!
//! Run with: cargo run --example simple_relay [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example simple_relay                  # binds to 0.0.0.0:8081
//!   cargo run --example simple_relay localhost        # binds to 127.0.0.1:8081
//!   cargo run --example simple_relay 127.0.0.1:9000   # binds to 127.0.0.1:9000
//!
//! Connect a few clients with netcat and type:
//!   nc localhost 8081
//!
//! Every line one client sends is relayed to all the others as
//! `[HH:MM:SS] <address>: <text>`.

use std::net::SocketAddr;

use relay_rs::{RelayHandler, RelayServer, ServerConfig};

/// Handler that mirrors relayed traffic to the operator's terminal
struct ConsoleHandler;

impl RelayHandler for ConsoleHandler {
    fn on_inbound_event(&self, text: &str) {
        println!("{text}");
    }
}

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:8081
/// - "127.0.0.1" -> 127.0.0.1:8081
/// - "127.0.0.1:9000" -> 127.0.0.1:9000
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    const DEFAULT_PORT: u16 = 8081;

    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    let bind_addr = match args.get(1) {
        Some(addr_str) => match parse_bind_addr(addr_str) {
            Ok(addr) => addr,
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
        None => "0.0.0.0:8081".parse().unwrap(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("relay_rs=info".parse()?),
        )
        .init();

    let config = ServerConfig::default().bind(bind_addr);
    println!("Starting relay on {}", config.bind_addr);
    println!("Connect with: nc {} {}", bind_addr.ip(), bind_addr.port());

    let server = RelayServer::new(config, ConsoleHandler);

    // Signal wiring stays out here, in the front-end
    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await?;

    Ok(())
}
