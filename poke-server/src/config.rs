use std::{fs, ops::RangeInclusive};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

#[derive(Parser, Debug, Clone, Deserialize)]
#[command(name = "server")]
#[command(author, version, about, long_about = None)]
pub struct AppConfig {
    #[clap(long)]
    #[arg(short = 'c')]
    #[serde(default)]
    pub config: Option<String>,
    /// MariaDB/MySQL connection string. Without it records live in memory.
    #[clap(long, env)]
    #[serde(default)]
    pub database_url: Option<String>,
    #[clap(long, env)]
    #[arg(default_value_t = 10)]
    #[serde(default = "default_max_size")]
    pub max_size: u32,
    #[clap(long, env)]
    #[arg(default_value_t = 1)]
    #[serde(default = "default_min_idle")]
    pub min_idle: u32,
    #[clap(long, env)]
    #[arg(default_value_t = false)]
    #[serde(default)]
    pub run_migrations: bool,
    #[clap(long, env)]
    #[arg(default_value_t = String::from("poke_server=info"))]
    #[serde(default = "default_rust_log")]
    pub rust_log: String,
    #[clap(long, env)]
    #[arg(value_parser = port_in_range, short = 'p', default_value_t = 3004)]
    #[serde(default = "default_port")]
    pub port: u16,
    /// Token of an ADMIN user ensured at startup.
    #[clap(long, env = "ADMIN_SECRET_TOKEN")]
    #[serde(default)]
    pub admin_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            database_url: None,
            max_size: default_max_size(),
            min_idle: default_min_idle(),
            run_migrations: false,
            rust_log: default_rust_log(),
            port: default_port(),
            admin_token: None,
        }
    }
}

fn default_rust_log() -> String {
    String::from("poke_server=info")
}

fn default_port() -> u16 {
    3004
}

fn default_max_size() -> u32 {
    10
}

fn default_min_idle() -> u32 {
    1
}

const PORT_RANGE: RangeInclusive<usize> = 1..=65535;

fn port_in_range(s: &str) -> Result<u16, String> {
    let port: usize = s
        .parse()
        .map_err(|_| format!("`{s}` isn't a port number"))?;
    if PORT_RANGE.contains(&port) {
        Ok(port as u16)
    } else {
        Err(format!(
            "port not in range {}-{}",
            PORT_RANGE.start(),
            PORT_RANGE.end()
        ))
    }
}

pub fn load(cfg: &str) -> Result<AppConfig> {
    let content =
        fs::read_to_string(cfg).context("could not read config file")?;
    toml::from_str(&content).context("could not parse config file")
}
