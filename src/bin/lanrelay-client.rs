use std::net::SocketAddr;
use std::process::ExitCode;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::signal;
use tracing::{error, info, warn};

use lanrelay::client::{FrameWriter, LineSplitter};
use lanrelay::config::ClientTarget;
use lanrelay::logging::init_tracing;
use lanrelay::relay::discover;
use lanrelay::wire::MAX_MESSAGE_SIZE;
use lanrelay::{ChatClient, ClientConfig, RelayError};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const APP_NAME: &str = "lanrelay-client";
const STDIN_CAPACITY_HINT: usize = 4096;

// -----------------------------------------------------------------------------
// ----- Main ------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ClientConfig::from_args() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{APP_NAME}: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.log_level);

    let addr = match resolve_server(&config).await {
        Ok(addr) => addr,
        Err(e) => {
            error!("{e}");
            eprintln!("Discovery failed. Provide --host and --port.");
            return ExitCode::FAILURE;
        }
    };

    let client = match ChatClient::connect(addr).await {
        Ok(client) => client,
        Err(e) => {
            error!("connect to {addr} failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!("Connected. Type messages and press Enter to send. Ctrl+C to quit.");

    match chat(client).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Setup -----------------------------------------------------------------

async fn resolve_server(config: &ClientConfig) -> Result<SocketAddr, RelayError> {
    match config.target {
        ClientTarget::Direct { host, port } => Ok(SocketAddr::new(host, port)),
        ClientTarget::Discover { discovery_port } => {
            let addr = discover(discovery_port, config.discovery_timeout).await?;
            eprintln!("Discovered server {addr}");
            Ok(addr)
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Chat Loop -------------------------------------------------------------

async fn chat(client: ChatClient) -> Result<(), RelayError> {
    let (mut reader, mut writer) = client.into_split();

    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut input = BytesMut::with_capacity(STDIN_CAPACITY_HINT);
    let mut lines = LineSplitter::new();

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("interrupted");
                break;
            }

            // -- Relayed messages --
            frame = reader.next_frame() => {
                let Some(payload) = frame? else {
                    eprintln!("Disconnected.");
                    break;
                };

                stdout.write_all(&payload).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }

            // -- Terminal input --
            read = async {
                input.reserve(STDIN_CAPACITY_HINT);
                stdin.read_buf(&mut input).await
            } => {
                let n = read?;
                if n == 0 {
                    if let Some(tail) = lines.take_remainder() {
                        send_line(&mut writer, &tail).await?;
                    }
                    break;
                }

                lines.push(&input.split());
                while let Some(line) = lines.next_line() {
                    send_line(&mut writer, &line).await?;
                }
            }
        }
    }

    let _ = writer.shutdown().await;
    Ok(())
}

async fn send_line(writer: &mut FrameWriter, line: &[u8]) -> Result<(), RelayError> {
    if line.is_empty() {
        return Ok(());
    }

    if line.len() > MAX_MESSAGE_SIZE {
        warn!(
            "line of {} bytes exceeds the {MAX_MESSAGE_SIZE} byte limit; not sent",
            line.len()
        );
        return Ok(());
    }

    writer.send(line).await
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
