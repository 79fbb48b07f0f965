use std::sync::Arc;

use clap::Parser;
use log::info;
use tokio::net::TcpListener;

use pentago_server::{Config, Registry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Config::parse();

    let listener = TcpListener::bind(config.address()).await?;
    info!("Listening on {}", listener.local_addr()?);

    let registry = Arc::new(Registry::new(config.banner));

    tokio::select! {
        _ = pentago_server::serve(listener, registry) => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutting down");
        }
    }
    Ok(())
}
