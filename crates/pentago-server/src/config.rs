use clap::Parser;

pub const DEFAULT_BANNER: &str = "Pentago server";

/// Pentago match server
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Config {
    /// Address to bind to
    #[arg(short = 'H', long, env = "PENTAGO_HOST", default_value = "127.0.0.1")]
    pub host: String,
    /// Port to listen on
    #[arg(short, long, env = "PENTAGO_PORT", default_value_t = 8080)]
    pub port: u16,
    /// Name sent back in the HELLO reply
    #[arg(short, long, env = "PENTAGO_BANNER", default_value = DEFAULT_BANNER)]
    pub banner: String,
}

impl Config {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
