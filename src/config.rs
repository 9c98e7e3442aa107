use crate::dispatcher::DispatcherSettings;
use crate::range::RangePolicy;
use anyhow::{Context, Result, anyhow};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:./tracker.db";
pub const DEFAULT_NATIVE_SYMBOL: &str = "MON";

#[derive(Debug, Clone)]
pub struct Config {
    pub json_rpc_urls: Vec<String>,
    pub database_url: String,
    pub check_interval: Duration,
    pub max_retries: usize,
    pub request_timeout: Duration,
    pub cycle_timeout: Duration,
    pub notify_timeout: Duration,
    pub bootstrap_blocks: u64,
    pub max_range_blocks: u64,
    pub max_concurrent_addresses: usize,
    pub fetch_concurrency: usize,
    pub native_symbol: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let json_rpc_urls: Vec<String> = lookup("JSON_RPC_URLS")
            .or_else(|| lookup("JSON_RPC_URL"))
            .context("JSON_RPC_URLS or JSON_RPC_URL must be set in .env")?
            .split(',')
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();

        if json_rpc_urls.is_empty() {
            return Err(anyhow!("JSON_RPC_URLS contains no RPC endpoint"));
        }

        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let native_symbol =
            lookup("NATIVE_SYMBOL").unwrap_or_else(|| DEFAULT_NATIVE_SYMBOL.to_string());

        Ok(Config {
            json_rpc_urls,
            database_url,
            check_interval: Duration::from_secs(parse_or(&lookup, "CHECK_INTERVAL_SECS", 10)?),
            max_retries: parse_or(&lookup, "MAX_RETRIES", 3)?,
            request_timeout: Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?),
            cycle_timeout: Duration::from_secs(parse_or(&lookup, "CYCLE_TIMEOUT_SECS", 120)?),
            notify_timeout: Duration::from_secs(parse_or(&lookup, "NOTIFY_TIMEOUT_SECS", 10)?),
            bootstrap_blocks: parse_or(&lookup, "BOOTSTRAP_BLOCKS", 100)?,
            max_range_blocks: parse_or(&lookup, "MAX_RANGE_BLOCKS", 1000)?,
            max_concurrent_addresses: parse_or(&lookup, "MAX_CONCURRENT_ADDRESSES", 4)?,
            fetch_concurrency: parse_or(&lookup, "FETCH_CONCURRENCY", 8)?,
            native_symbol,
        })
    }

    /// Database location for the offline tools, which need no RPC endpoint.
    pub fn database_url_from_env() -> String {
        dotenv::dotenv().ok();
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
    }

    pub fn native_symbol_from_env() -> String {
        dotenv::dotenv().ok();
        std::env::var("NATIVE_SYMBOL").unwrap_or_else(|_| DEFAULT_NATIVE_SYMBOL.to_string())
    }

    pub fn range_policy(&self) -> RangePolicy {
        RangePolicy {
            bootstrap_blocks: self.bootstrap_blocks,
            max_range: self.max_range_blocks,
        }
    }

    pub fn dispatcher_settings(&self) -> DispatcherSettings {
        DispatcherSettings {
            range_policy: self.range_policy(),
            max_concurrent_addresses: self.max_concurrent_addresses,
            fetch_concurrency: self.fetch_concurrency,
            cycle_timeout: self.cycle_timeout,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {key} value {raw:?}: {e}")),
        None => Ok(default),
    }
}
