use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use pentago_core::protocol::{ClientMessage, ServerMessage};

pub struct NetworkClient {
    pub sender: mpsc::UnboundedSender<ClientMessage>,
    pub receiver: mpsc::UnboundedReceiver<ServerMessage>,
    writer: JoinHandle<()>,
}

impl NetworkClient {
    /// Connect to the server at `addr` (host:port)
    pub async fn connect(addr: &str) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (reader, mut writer) = stream.into_split();

        let (client_tx, mut client_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let (server_tx, server_rx) = mpsc::unbounded_channel::<ServerMessage>();

        // Sender task: one line per client message
        let writer = tokio::spawn(async move {
            while let Some(msg) = client_rx.recv().await {
                let line = format!("{msg}\n");
                if writer.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
            }
            let _ = writer.shutdown().await;
        });

        // Receiver task: parse server lines, skipping anything unknown
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match line.parse::<ServerMessage>() {
                    Ok(msg) => {
                        if server_tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Err(e) => debug!("skipping {line:?}: {e}"),
                }
            }
        });

        Ok(Self {
            sender: client_tx,
            receiver: server_rx,
            writer,
        })
    }

    pub fn send(&self, msg: ClientMessage) {
        let _ = self.sender.send(msg);
    }

    /// Flushes everything sent so far and closes the write side.
    pub async fn close(self) {
        drop(self.sender);
        let _ = self.writer.await;
    }
}
