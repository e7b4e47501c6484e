//! Startup configuration.
//!
//! A `.env` file in the working directory is loaded first when present, then
//! process environment variables are read:
//!
//! - `ADDR` (required): a bare port such as `8080` (bound on all interfaces)
//!   or a full socket address such as `127.0.0.1:8080`.
//! - `LEDGER_REQUEST_TIMEOUT_SECS`: per-request timeout, default `10`.
//! - `LEDGER_MAX_BODY_BYTES`: request body cap, default `1048576`.
//! - `LEDGER_LOG_FORMAT`: `pretty` (default) or `json`.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_BODY_BYTES: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
    pub log_format: LogFormat,
}

impl Config {
    /// Load `.env` (if any) and build the config from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(e.into());
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr = lookup("ADDR").ok_or(ConfigError::Missing("ADDR"))?;
        let listen_addr = parse_listen_addr(&addr)?;

        let request_timeout = match lookup("LEDGER_REQUEST_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_number("LEDGER_REQUEST_TIMEOUT_SECS", &v)?),
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        let max_body_bytes = match lookup("LEDGER_MAX_BODY_BYTES") {
            Some(v) => parse_number("LEDGER_MAX_BODY_BYTES", &v)?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        let log_format = match lookup("LEDGER_LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "LEDGER_LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            listen_addr,
            request_timeout,
            max_body_bytes,
            log_format,
        })
    }
}

fn parse_listen_addr(raw: &str) -> Result<SocketAddr, ConfigError> {
    let raw = raw.trim();
    let port = raw.strip_prefix(':').unwrap_or(raw);
    if let Ok(port) = port.parse::<u16>() {
        return Ok(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)));
    }
    raw.parse().map_err(|_| ConfigError::Invalid {
        key: "ADDR",
        value: raw.to_string(),
    })
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn bare_port_binds_all_interfaces() {
        let cfg = load(&[("ADDR", "8080")]).unwrap();
        assert_eq!(cfg.listen_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.request_timeout, Duration::from_secs(10));
        assert_eq!(cfg.max_body_bytes, 1 << 20);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
    }

    #[test]
    fn colon_port_and_full_address() {
        assert_eq!(load(&[("ADDR", ":9000")]).unwrap().listen_addr.port(), 9000);
        let cfg = load(&[("ADDR", "127.0.0.1:3000")]).unwrap();
        assert_eq!(cfg.listen_addr, "127.0.0.1:3000".parse().unwrap());
    }

    #[test]
    fn missing_addr_is_fatal() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("ADDR"))));
    }

    #[test]
    fn garbage_values_are_rejected() {
        assert!(matches!(
            load(&[("ADDR", "not-an-address")]),
            Err(ConfigError::Invalid { key: "ADDR", .. })
        ));
        assert!(load(&[("ADDR", "80"), ("LEDGER_REQUEST_TIMEOUT_SECS", "soon")]).is_err());
        assert!(load(&[("ADDR", "80"), ("LEDGER_LOG_FORMAT", "xml")]).is_err());
    }

    #[test]
    fn overrides_apply() {
        let cfg = load(&[
            ("ADDR", "80"),
            ("LEDGER_REQUEST_TIMEOUT_SECS", "3"),
            ("LEDGER_MAX_BODY_BYTES", "512"),
            ("LEDGER_LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(cfg.request_timeout, Duration::from_secs(3));
        assert_eq!(cfg.max_body_bytes, 512);
        assert_eq!(cfg.log_format, LogFormat::Json);
    }
}
