use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Postgres connection string; pictures are kept in memory when unset
    pub database_url: Option<String>,
    /// Redis connection string; the feed cache is in-process when unset
    pub redis_url: Option<String>,
    pub cache_op_timeout: Duration,
    pub feed_stale_after: Duration,
    pub blob_dir: PathBuf,
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3004);

        let database_url = non_empty_var("DATABASE_URL");
        let redis_url = non_empty_var("REDIS_URL");

        let cache_op_timeout = env::var("CACHE_OP_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(500));

        let feed_stale_after = env::var("FEED_STALE_AFTER_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(oekaki_feed_cache::STALE_AFTER);

        let blob_dir = env::var("BLOB_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/pictures"));

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|s| parse_origins(&s))
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ]
            });

        Self {
            port,
            database_url,
            redis_url,
            cache_op_timeout,
            feed_stale_after,
            blob_dir,
            cors_origins,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins_trims_and_skips_blanks() {
        assert_eq!(
            parse_origins(" https://oekaki.example , ,http://localhost:3000"),
            vec!["https://oekaki.example", "http://localhost:3000"]
        );
    }

    #[test]
    fn test_parse_origins_wildcard() {
        assert_eq!(parse_origins("*"), vec!["*"]);
    }
}
