//! Command-line and environment configuration.

use crate::logging::LogFormat;
use crate::medium::DEFAULT_API_BASE;
use clap::Parser;
use std::net::{IpAddr, SocketAddr};

#[derive(Parser, Debug, Clone)]
#[command(name = "medium-mcp-server", version, about, long_about = None)]
pub struct Config {
    /// Serve HTTP+SSE on this port. Without it, the server speaks MCP over stdio.
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Address to bind in HTTP mode.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Medium integration token.
    #[arg(long, env = "MEDIUM_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: String,

    /// Base URL of the Medium API.
    #[arg(long, env = "MEDIUM_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Log output format (logs always go to stderr).
    #[arg(long, env = "MEDIUM_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Which transport to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Stdio,
    Http(SocketAddr),
}

impl Config {
    pub fn mode(&self) -> Mode {
        match self.port {
            Some(port) => Mode::Http(SocketAddr::new(self.host, port)),
            None => Mode::Stdio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_selects_http_mode() {
        let config = Config::try_parse_from([
            "medium-mcp-server",
            "--access-token",
            "tok",
            "--port",
            "3000",
            "--host",
            "127.0.0.1",
        ])
        .unwrap();
        assert_eq!(config.mode(), Mode::Http("127.0.0.1:3000".parse().unwrap()));
        assert_eq!(config.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn json_log_format_is_accepted() {
        let config = Config::try_parse_from([
            "medium-mcp-server",
            "--access-token",
            "tok",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn invalid_port_is_rejected() {
        let result = Config::try_parse_from([
            "medium-mcp-server",
            "--access-token",
            "tok",
            "--port",
            "not-a-port",
        ]);
        assert!(result.is_err());
    }
}
