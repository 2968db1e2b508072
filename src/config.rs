use anyhow::{Context, Result};
use clap::Parser;
use std::env;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
///
/// Discovery parameters (node label, network, credential variables) are
/// fixed constants in `services::discovery` and deliberately not exposed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Sharding gateway for MinIO storage nodes")]
pub struct Args {
    /// Host to bind to (overrides GATEWAY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides GATEWAY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Largest accepted upload body in bytes (overrides GATEWAY_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Discover nodes, prepare their buckets, print the ring and exit
    #[arg(long)]
    pub discover_only: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the discover-only flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let discover_only = args.discover_only;
        Ok((Self::merge(args, |key| env::var(key))?, discover_only))
    }

    /// CLI values win over environment values, which win over defaults.
    fn merge<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let env_host = lookup("GATEWAY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_var(&lookup, "GATEWAY_PORT", 3000u16)?;
        let env_max_upload =
            parse_var(&lookup, "GATEWAY_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Result<String, env::VarError>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_in(
        vars: HashMap<&'static str, &'static str>,
    ) -> impl Fn(&str) -> Result<String, env::VarError> {
        move |key| {
            vars.get(key)
                .map(|v| v.to_string())
                .ok_or(env::VarError::NotPresent)
        }
    }

    #[test]
    fn defaults_apply_without_env_or_args() {
        let cfg = AppConfig::merge(Args::default(), lookup_in(HashMap::new())).unwrap();
        assert_eq!(cfg.addr(), "0.0.0.0:3000");
        assert_eq!(cfg.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn args_override_env() {
        let vars = HashMap::from([("GATEWAY_HOST", "127.0.0.1"), ("GATEWAY_PORT", "8080")]);
        let args = Args {
            port: Some(9090),
            ..Default::default()
        };
        let cfg = AppConfig::merge(args, lookup_in(vars)).unwrap();
        assert_eq!(cfg.addr(), "127.0.0.1:9090");
    }

    #[test]
    fn malformed_port_is_an_error() {
        let vars = HashMap::from([("GATEWAY_PORT", "eighty")]);
        let err = AppConfig::merge(Args::default(), lookup_in(vars)).unwrap_err();
        assert!(err.to_string().contains("GATEWAY_PORT"));
    }

    #[test]
    fn cli_flags_parse() {
        let args = Args::parse_from(["shard-gateway", "--port", "4000", "--discover-only"]);
        assert_eq!(args.port, Some(4000));
        assert!(args.discover_only);
    }
}
