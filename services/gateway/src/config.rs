use std::env;
use std::net::SocketAddr;

use tracing::warn;

/// Gateway runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address the HTTP surface binds.
    pub addr: SocketAddr,
    /// Base URL of the quiz catalog service. `None` runs the gateway
    /// without a catalog: no existence checks, no durable persistence.
    pub catalog_url: Option<String>,
    /// Reject submissions for quizzes the catalog does not know.
    pub require_known_quiz: bool,
    /// Backfill an empty live board from the durable ranking on read.
    pub seed_on_cold_start: bool,
    /// Outbound queue capacity per realtime connection.
    pub ws_queue_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            catalog_url: None,
            require_known_quiz: false,
            seed_on_cold_start: false,
            ws_queue_capacity: 32,
        }
    }
}

impl GatewayConfig {
    /// Build configuration from the environment, keeping defaults for
    /// anything unset. Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = env::var("GATEWAY_ADDR") {
            match raw.parse() {
                Ok(addr) => config.addr = addr,
                Err(_) => warn!(raw = %raw, "ignoring unparseable GATEWAY_ADDR"),
            }
        }

        if let Ok(url) = env::var("CATALOG_URL") {
            if !url.is_empty() {
                config.catalog_url = Some(url);
            }
        }

        if let Ok(raw) = env::var("REQUIRE_KNOWN_QUIZ") {
            config.require_known_quiz = parse_flag(&raw);
        }

        if let Ok(raw) = env::var("SEED_ON_COLD_START") {
            config.seed_on_cold_start = parse_flag(&raw);
        }

        config
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_parsing_accepts_common_truthy_forms() {
        assert!(parse_flag("1"));
        assert!(parse_flag("true"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" yes "));
        assert!(parse_flag("on"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
        assert!(!parse_flag("enabled"));
    }

    #[test]
    fn defaults_run_decoupled_from_the_catalog() {
        let config = GatewayConfig::default();
        assert_eq!(config.addr, SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert!(config.catalog_url.is_none());
        assert!(!config.require_known_quiz);
        assert!(!config.seed_on_cold_start);
    }
}
