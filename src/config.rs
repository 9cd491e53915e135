//! Parses process arguments into a validated [`Config`].
//!
//! The real configuration surface here is a handful of positional
//! arguments, not a document, so this mirrors the corpus's own preference
//! for direct `std::env::args()` parsing over a config-file crate.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing mode argument; usage: {0}")]
    MissingMode(&'static str),
    #[error("unknown mode {0:?}; expected server|client|proxy|http-proxy")]
    UnknownMode(String),
    #[error("invalid port {0:?}")]
    InvalidPort(String),
    #[error("client mode requires a host and a port")]
    ClientMissingArgs,
}

const USAGE: &str = "relaysuite server <port> | client <host> <port> [proxy-host] [proxy-port] | proxy <port> | http-proxy <port>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Server { port: u16 },
    Client {
        host: String,
        port: u16,
        proxy: Option<(String, u16)>,
    },
    Proxy { port: u16 },
    HttpProxy { port: u16 },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub forbidden_words_path: PathBuf,
    pub log_dir: PathBuf,
}

impl Config {
    /// Parses `argv` excluding the program name (i.e. `&args[1..]`).
    pub fn parse(argv: &[String]) -> Result<Config, ConfigError> {
        let mode_str = argv.first().ok_or(ConfigError::MissingMode(USAGE))?;
        let rest = &argv[1..];
        let mode = match mode_str.as_str() {
            "server" => Mode::Server {
                port: parse_port_or_default(rest.first(), 5000)?,
            },
            "proxy" => Mode::Proxy {
                port: parse_port_or_default(rest.first(), 5000)?,
            },
            "http-proxy" => Mode::HttpProxy {
                port: parse_port_or_default(rest.first(), 8080)?,
            },
            "client" => {
                if rest.len() < 2 {
                    return Err(ConfigError::ClientMissingArgs);
                }
                let host = rest[0].clone();
                let port = parse_port(&rest[1])?;
                let proxy = if rest.len() >= 4 {
                    Some((rest[2].clone(), parse_port(&rest[3])?))
                } else {
                    None
                };
                Mode::Client { host, port, proxy }
            }
            other => return Err(ConfigError::UnknownMode(other.to_string())),
        };
        Ok(Config {
            mode,
            forbidden_words_path: PathBuf::from("forbidden.txt"),
            log_dir: PathBuf::from("logs"),
        })
    }
}

fn parse_port(s: &str) -> Result<u16, ConfigError> {
    s.parse::<u16>()
        .map_err(|_| ConfigError::InvalidPort(s.to_string()))
}

fn parse_port_or_default(s: Option<&String>, default: u16) -> Result<u16, ConfigError> {
    match s {
        Some(s) => parse_port(s),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn server_mode_defaults_port() {
        let cfg = Config::parse(&args(&["server"])).unwrap();
        assert_eq!(cfg.mode, Mode::Server { port: 5000 });
    }

    #[test]
    fn http_proxy_mode_defaults_port() {
        let cfg = Config::parse(&args(&["http-proxy"])).unwrap();
        assert_eq!(cfg.mode, Mode::HttpProxy { port: 8080 });
    }

    #[test]
    fn client_mode_requires_host_and_port() {
        assert!(matches!(
            Config::parse(&args(&["client", "onlyhost"])),
            Err(ConfigError::ClientMissingArgs)
        ));
    }

    #[test]
    fn client_mode_with_proxy_args() {
        let cfg = Config::parse(&args(&["client", "files.example.com", "5000", "proxyhost", "6000"]))
            .unwrap();
        assert_eq!(
            cfg.mode,
            Mode::Client {
                host: "files.example.com".to_string(),
                port: 5000,
                proxy: Some(("proxyhost".to_string(), 6000)),
            }
        );
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(matches!(
            Config::parse(&args(&["telnet"])),
            Err(ConfigError::UnknownMode(_))
        ));
    }

    #[test]
    fn missing_mode_is_rejected() {
        assert!(matches!(Config::parse(&[]), Err(ConfigError::MissingMode(_))));
    }
}
