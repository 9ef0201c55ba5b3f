//! We can have a little hard-coded config, [as a
//! snack](https://knowyourmeme.com/memes/cats-can-have-a-little-salami).
//! Everything else comes from the environment, optionally via `.env`.

use anyhow::{Context, Result};
use std::{env, net::SocketAddr};

/// Where the remote procedures are mounted.
pub const RPC_PREFIX: &str = "/api/trpc";

/// Upper bound on the number of calls in one batched request. Nothing in the
/// UI batches more than a couple of calls, so anything beyond this is junk.
pub const BATCH_MAX: usize = 32;

/// Postgres would let us have 100; SQLite serializes writers anyway.
pub const DB_MAX_CONNECTIONS: u32 = 8;

const DEFAULT_DATABASE_URL: &str = "sqlite://todos.db";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse()
            .with_context(|| format!("BIND_ADDR {bind_addr:?} is not a socket address"))?;

        Ok(Config {
            database_url,
            bind_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both cases live in one test because they mutate the same process-wide
    // environment variables.
    #[test]
    fn test_from_env() {
        env::remove_var("DATABASE_URL");
        env::remove_var("BIND_ADDR");
        let config = Config::from_env().expect("defaults are valid");
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bind_addr.port(), 3000);

        env::set_var("BIND_ADDR", "not an address");
        assert!(Config::from_env().is_err());

        env::set_var("BIND_ADDR", "0.0.0.0:8080");
        env::set_var("DATABASE_URL", "sqlite::memory:");
        let config = Config::from_env().expect("overrides are valid");
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.database_url, "sqlite::memory:");

        env::remove_var("DATABASE_URL");
        env::remove_var("BIND_ADDR");
    }
}
