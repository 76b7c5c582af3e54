//! Server configuration from flags and environment.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "privy-pin-api", version, about = "Viewport-scoped pin API")]
pub struct Config {
    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    /// Spatial index cell size in degrees.
    #[arg(long, env = "PRIVY_PIN_GRID_CELL", default_value_t = 1.0)]
    pub grid_cell: f64,

    /// JSON file with an array of pins to load at startup.
    #[arg(long, env = "PRIVY_PIN_SEED")]
    pub seed: Option<PathBuf>,
}

impl Config {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
