use std::{str::FromStr, time::Duration};

use anyhow::Context;

use crate::gateway::{Environment, GatewaySettings};

const DEFAULT_PORT: u16 = 3030;
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_POLL_ATTEMPTS: usize = 12;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub gateway: GatewaySettings,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} is not defined"));
        let gateway = GatewaySettings {
            username: required("CAMPAY_APP_USERNAME")?,
            password: required("CAMPAY_APP_PASSWORD")?,
            environment: parse_or(&lookup, "CAMPAY_ENVIRONMENT", Environment::default())?,
            base_url: lookup("CAMPAY_BASE_URL").filter(|v| !v.is_empty()),
            timeout: Duration::from_secs(parse_or(
                &lookup,
                "CAMPAY_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
            poll_attempts: parse_or(&lookup, "CAMPAY_POLL_ATTEMPTS", DEFAULT_POLL_ATTEMPTS)?,
            poll_interval: Duration::from_secs(parse_or(
                &lookup,
                "CAMPAY_POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            )?),
        };
        Ok(Self {
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            gateway,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {key} value {raw:?}: {e}")),
        None => Ok(default),
    }
}
