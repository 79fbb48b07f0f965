pub mod config;
pub mod connection;
pub mod error;
pub mod queue;
pub mod registry;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use log::warn;
use tokio::net::TcpListener;

pub use config::Config;
pub use error::GameError;
pub use registry::Registry;

const ACCEPT_RETRY: Duration = Duration::from_millis(100);

/// Accepts clients forever, one task per socket.
pub async fn serve(listener: TcpListener, registry: Arc<Registry>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                tokio::spawn(connection::handle_connection(registry.clone(), stream, addr));
            }
            Err(e) => {
                warn!("accept failed: {e}");
                tokio::time::sleep(ACCEPT_RETRY).await;
            }
        }
    }
}
