mod game;
mod net;

use clap::Parser;
use log::{info, warn};

use pentago_core::StrategyKind;

use crate::game::BotGame;
use crate::net::client::NetworkClient;

/// Plays Pentago matches against whoever the server pairs it with
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server address
    #[arg(short = 'H', long, env = "PENTAGO_HOST", default_value = "127.0.0.1")]
    host: String,
    /// Server port
    #[arg(short, long, env = "PENTAGO_PORT", default_value_t = 8080)]
    port: u16,
    /// Name to log in with; a number is appended while it is taken
    #[arg(short, long, default_value = "bot")]
    name: String,
    /// How moves are picked: naive or smart
    #[arg(short, long, default_value_t = StrategyKind::Smart)]
    strategy: StrategyKind,
    /// Matches to play before quitting, 0 for no limit
    #[arg(short, long, default_value_t = 1)]
    games: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let address = format!("{}:{}", args.host, args.port);
    let mut client = NetworkClient::connect(&address).await?;
    info!("Connected to {address}, playing {}", args.strategy);

    let mut bot = BotGame::new(args.name, args.strategy.build(), args.games);
    client.send(bot.greeting());

    while let Some(msg) = client.receiver.recv().await {
        for reply in bot.handle(msg) {
            client.send(reply);
        }
        if bot.is_done() {
            break;
        }
    }
    if bot.is_done() {
        info!("Done playing as {}", bot.name());
    } else {
        warn!("Server closed the connection");
    }
    client.close().await;
    Ok(())
}
