//! parley client - line-oriented chat in the terminal
//!
//! Every line typed is published to the server; every message from other
//! participants (including the history sent on connect) is printed as it
//! arrives.

use tokio::io::{AsyncBufReadExt, BufReader};

use parley_protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use parley_utils::{init_logging_with_config, LogConfig, ParleyError, Result};

mod cli;
mod connection;
mod input;
mod render;

use cli::Args;
use connection::Connection;
use input::{parse_input, Input};
use render::render;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    // Log to file so tracing output does not interleave with the transcript
    init_logging_with_config(LogConfig::client())?;
    tracing::info!("parley client starting");
    tracing::debug!("CLI args: {:?}", args);

    match run_app(args).await {
        Ok(()) => {
            tracing::info!("parley client exiting normally");
            Ok(())
        }
        Err(e) => {
            tracing::error!("parley client error: {}", e);
            eprintln!("Error: {}", e);
            Err(e)
        }
    }
}

async fn run_app(args: Args) -> Result<()> {
    let author = args.author();

    let mut conn = Connection::with_addr(args.addr.clone());
    conn.connect().await?;
    conn.send(ClientMessage::Hello {
        author: author.clone(),
        protocol_version: PROTOCOL_VERSION,
    })
    .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    // stdin closed
                    break;
                };
                match parse_input(&line) {
                    Input::Say(body) => conn.send(ClientMessage::post(author.clone(), body)).await?,
                    Input::Ping => conn.send(ClientMessage::Ping).await?,
                    Input::Quit => break,
                    Input::Empty => {}
                }
            }

            msg = conn.recv() => {
                let Some(msg) = msg else {
                    eprintln!("* server closed the connection");
                    break;
                };
                if let Some(text) = render(&msg) {
                    println!("{}", text);
                }
                if let ServerMessage::Error { message, .. } = msg {
                    conn.disconnect().await;
                    return Err(ParleyError::connection(message));
                }
            }
        }
    }

    conn.disconnect().await;
    Ok(())
}
