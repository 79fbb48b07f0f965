//! One task per accepted socket.

use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;

use pentago_core::{ClientMessage, ServerMessage};

use crate::error::GameError;
use crate::registry::Registry;
use crate::state::{ConnectionId, Outbound};

/// Longest accepted line in bytes, newline included. Longer lines are
/// dropped whole.
pub const MAX_LINE: usize = 4096;

/// Serves a client until it quits or the socket closes, then removes it
/// from the registry.
pub async fn handle_connection(registry: Arc<Registry>, stream: TcpStream, addr: SocketAddr) {
    let _ = stream.set_nodelay(true);
    let (reader, writer) = stream.into_split();
    let (tx, rx) = mpsc::unbounded_channel::<ServerMessage>();

    let id = registry.connect(addr, tx.clone());
    let write_task = tokio::spawn(write_lines(id, writer, rx));

    read_lines(&registry, id, &tx, reader).await;

    registry.disconnect(id);
    // The writer stops once the registry and we have dropped every sender,
    // after it has flushed whatever was still queued.
    drop(tx);
    let _ = write_task.await;
}

async fn write_lines(
    id: ConnectionId,
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
) {
    while let Some(msg) = rx.recv().await {
        let line = format!("{msg}\n");
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            warn!("connection {id}: write failed: {e}");
            return;
        }
        if writer.flush().await.is_err() {
            return;
        }
    }
    let _ = writer.shutdown().await;
}

async fn read_lines(registry: &Registry, id: ConnectionId, tx: &Outbound, reader: OwnedReadHalf) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(MAX_LINE);
    // Set while skipping the rest of an overlong line.
    let mut discarding = false;
    loop {
        buf.clear();
        let mut limited = (&mut reader).take(MAX_LINE as u64);
        match limited.read_until(b'\n', &mut buf).await {
            Ok(0) => return,
            Ok(_) => {}
            Err(e) => {
                warn!("connection {id}: read failed: {e}");
                return;
            }
        }
        let complete = buf.ends_with(b"\n");
        if discarding {
            discarding = !complete;
            continue;
        }
        if !complete && buf.len() >= MAX_LINE {
            debug!("connection {id}: ignoring a line longer than {MAX_LINE} bytes");
            discarding = true;
            continue;
        }
        let Ok(line) = std::str::from_utf8(&buf) else {
            debug!("connection {id}: ignoring non-UTF-8 line");
            continue;
        };
        let msg = match line.parse::<ClientMessage>() {
            Ok(msg) => msg,
            Err(e) => {
                debug!("connection {id}: ignoring {:?}: {e}", line.trim_end());
                continue;
            }
        };
        if msg == ClientMessage::Quit {
            return;
        }
        if let Err(err) = handle_message(registry, id, msg) {
            reject(tx, id, err);
        }
    }
}

/// Dispatch a single client message.
fn handle_message(
    registry: &Registry,
    id: ConnectionId,
    msg: ClientMessage,
) -> Result<(), GameError> {
    match msg {
        ClientMessage::Hello { capabilities, .. } => registry.handshake(id, capabilities),
        ClientMessage::Login { username } => registry.login(id, &username),
        ClientMessage::Queue => registry.toggle_queue(id),
        ClientMessage::Move(mv) => registry.submit_move(id, mv),
        ClientMessage::Ping => registry.ping(id),
        ClientMessage::List => registry.list(id),
        ClientMessage::Rank => registry.rank(id),
        ClientMessage::Chat { text } => registry.chat(id, &text),
        ClientMessage::Whisper { target, text } => registry.whisper(id, &target, &text),
        ClientMessage::Pong | ClientMessage::Quit => Ok(()),
    }
}

fn reject(tx: &Outbound, id: ConnectionId, err: GameError) {
    debug!("connection {id}: {err}");
    let reply = match err {
        GameError::NameTaken(_) => ServerMessage::AlreadyLoggedIn,
        GameError::IllegalMove(_) | GameError::TurnOrder => ServerMessage::Error {
            reason: err.to_string(),
        },
        GameError::Protocol(_) | GameError::Capability(_) => return,
    };
    let _ = tx.send(reply);
}
