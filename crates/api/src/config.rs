//! Server and governance configuration loaded from environment variables.

use std::collections::{HashMap, HashSet};

use remedian_core::policy::{DenyRules, RulePolicy};
use remedian_core::throttle::ThrottleConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Governance flags and gate configuration.
    pub governance: GovernanceConfig,
}

/// Governance configuration: the global execution switch, executor feature
/// flags, throttle settings, and policy deny rules.
///
/// Injected as an explicit value object (not read from ambient state) so
/// tests can vary flags per case.
#[derive(Debug, Clone)]
pub struct GovernanceConfig {
    /// Global execution switch. When off, execute endpoints return 501 and
    /// nothing mutates. Default: off.
    pub enable_execution: bool,
    /// Per-action-type executor feature flags. An action type absent from
    /// the map, or mapped to `false`, dry-runs. Default: all off.
    pub executor_flags: HashMap<String, bool>,
    /// Bound on a single executor dispatch in seconds (default: `30`).
    pub executor_timeout_secs: u64,
    /// Fixed-window throttle settings. Default: disabled.
    pub throttle: ThrottleConfig,
    /// Tenants denied on every gate.
    pub suspended_tenants: HashSet<String>,
    /// Propose-time policy deny rules (`tenant:action_type`, `*` wildcard).
    pub propose_deny_rules: DenyRules,
    /// Execution-time policy deny rules, independent of the propose rules.
    pub execution_deny_rules: DenyRules,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            enable_execution: false,
            executor_flags: HashMap::new(),
            executor_timeout_secs: 30,
            throttle: ThrottleConfig::default(),
            suspended_tenants: HashSet::new(),
            propose_deny_rules: DenyRules::default(),
            execution_deny_rules: DenyRules::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                 |
    /// |--------------------------|-------------------------|
    /// | `HOST`                   | `0.0.0.0`               |
    /// | `PORT`                   | `3000`                  |
    /// | `CORS_ORIGINS`           | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                    |
    /// | `ENABLE_EXECUTION`       | `false`                 |
    /// | `EXECUTOR_FLAGS`         | (empty; all off)        |
    /// | `EXECUTOR_TIMEOUT_SECS`  | `30`                    |
    /// | `THROTTLE_ENABLED`       | `false`                 |
    /// | `THROTTLE_WINDOW_SECS`   | `60`                    |
    /// | `THROTTLE_MAX_ATTEMPTS`  | `10`                    |
    /// | `SUSPENDED_TENANTS`      | (empty)                 |
    /// | `PROPOSE_DENY_RULES`     | (empty)                 |
    /// | `EXECUTION_DENY_RULES`   | (empty)                 |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            governance: GovernanceConfig::from_env(),
        }
    }
}

impl GovernanceConfig {
    /// Load governance settings from environment variables.
    pub fn from_env() -> Self {
        let enable_execution = env_bool("ENABLE_EXECUTION", false);

        // `EXECUTOR_FLAGS` is a comma-separated `action_type=bool` list,
        // e.g. `http_probe=true,restart_pod=false`.
        let executor_flags = std::env::var("EXECUTOR_FLAGS")
            .unwrap_or_default()
            .split(',')
            .filter_map(|item| {
                let item = item.trim();
                if item.is_empty() {
                    return None;
                }
                match item.split_once('=') {
                    Some((action, flag)) => Some((
                        action.trim().to_string(),
                        flag.trim().eq_ignore_ascii_case("true"),
                    )),
                    None => {
                        tracing::warn!(flag = item, "Skipping malformed executor flag");
                        None
                    }
                }
            })
            .collect();

        let executor_timeout_secs: u64 = std::env::var("EXECUTOR_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("EXECUTOR_TIMEOUT_SECS must be a valid u64");

        let throttle = ThrottleConfig {
            enabled: env_bool("THROTTLE_ENABLED", false),
            window_secs: std::env::var("THROTTLE_WINDOW_SECS")
                .unwrap_or_else(|_| "60".into())
                .parse()
                .expect("THROTTLE_WINDOW_SECS must be a valid u64"),
            max_attempts: std::env::var("THROTTLE_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .expect("THROTTLE_MAX_ATTEMPTS must be a valid u32"),
        };

        let suspended_tenants: HashSet<String> = std::env::var("SUSPENDED_TENANTS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let propose_deny_rules =
            RulePolicy::parse_deny_rules(&std::env::var("PROPOSE_DENY_RULES").unwrap_or_default());
        let execution_deny_rules = RulePolicy::parse_deny_rules(
            &std::env::var("EXECUTION_DENY_RULES").unwrap_or_default(),
        );

        Self {
            enable_execution,
            executor_flags,
            executor_timeout_secs,
            throttle,
            suspended_tenants,
            propose_deny_rules,
            execution_deny_rules,
        }
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}
