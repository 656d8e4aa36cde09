use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use directories::ProjectDirs;
use sweep_ipc::BridgeConfig;

use crate::error::{Result, WorkerError};
use crate::retry::RetryPolicy;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;
const BRIDGE_DIR: &str = "bridge";
const BRIDGE_ENTRY: &str = "bridge.py";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub log_path: PathBuf,
    pub bridge: BridgeConfig,
    pub settings: WorkerSettings,
}

/// The part of the configuration the worker itself needs.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub sessions_dir: PathBuf,
    pub retry: RetryPolicy,
}

impl WorkerSettings {
    /// Session file for one phone number.
    pub fn session_path(&self, phone_number: &str) -> PathBuf {
        self.sessions_dir.join(format!("{}_session", phone_number))
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = match var("SWEEP_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };
        let db_path = var("SWEEP_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("accounts.db"));
        let sessions_dir = var("SWEEP_SESSIONS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("sessions"));
        let log_path = var("SWEEP_LOG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("sweep.log"));

        let request_timeout = Duration::from_secs(
            parse_var(&var, "SWEEP_REQUEST_TIMEOUT_SECS")?.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        );
        let retry = RetryPolicy {
            max_retries: parse_var(&var, "SWEEP_MAX_RETRIES")?,
            max_total_wait: parse_var::<u64>(&var, "SWEEP_MAX_RETRY_WAIT_SECS")?
                .map(Duration::from_secs),
        };

        let bridge_dir = var("SWEEP_BRIDGE_DIR").map(PathBuf::from);
        let bridge = match var("SWEEP_BRIDGE_CMD") {
            Some(command) => {
                let mut parts = command.split_whitespace().map(str::to_string);
                let program = parts
                    .next()
                    .ok_or_else(|| WorkerError::Config("SWEEP_BRIDGE_CMD is empty".into()))?;
                BridgeConfig {
                    program,
                    args: parts.collect(),
                    working_dir: bridge_dir,
                    request_timeout,
                }
            }
            None => BridgeConfig {
                program: "python3".to_string(),
                args: vec![BRIDGE_ENTRY.to_string()],
                working_dir: Some(
                    bridge_dir
                        .or_else(find_bridge_dir)
                        .unwrap_or_else(|| data_dir.join(BRIDGE_DIR)),
                ),
                request_timeout,
            },
        };

        Ok(Self {
            data_dir,
            db_path,
            log_path,
            bridge,
            settings: WorkerSettings {
                sessions_dir,
                retry,
            },
        })
    }
}

fn parse_var<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    var(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| WorkerError::Config(format!("{} must be a number, got {:?}", key, raw)))
        })
        .transpose()
}

fn default_data_dir() -> Result<PathBuf> {
    ProjectDirs::from("org", "sweep", "sweep")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| WorkerError::Config("no home directory, set SWEEP_DATA_DIR".into()))
}

/// Looks for `bridge/bridge.py` next to the executable or any of its
/// ancestors, then in the working directory.
fn find_bridge_dir() -> Option<PathBuf> {
    let has_entry = |dir: &Path| dir.join(BRIDGE_ENTRY).is_file();

    if let Ok(exe_path) = std::env::current_exe() {
        let mut current = exe_path.parent();
        while let Some(dir) = current {
            let bridge = dir.join(BRIDGE_DIR);
            if has_entry(&bridge) {
                return Some(bridge);
            }
            current = dir.parent();
        }
    }

    let bridge = std::env::current_dir().ok()?.join(BRIDGE_DIR);
    has_entry(&bridge).then_some(bridge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_paths_follow_data_dir() {
        let config = load(&[("SWEEP_DATA_DIR", "/tmp/sweep-test")]).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/sweep-test/accounts.db"));
        assert_eq!(config.log_path, PathBuf::from("/tmp/sweep-test/sweep.log"));
        assert_eq!(
            config.settings.session_path("+15550100"),
            PathBuf::from("/tmp/sweep-test/sessions/+15550100_session")
        );
        assert!(config.settings.retry.is_unbounded());
        assert_eq!(
            config.bridge.request_timeout,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_bridge_command_and_retry_overrides() {
        let config = load(&[
            ("SWEEP_DATA_DIR", "/tmp/sweep-test"),
            ("SWEEP_BRIDGE_CMD", "node dist/bridge.js --quiet"),
            ("SWEEP_BRIDGE_DIR", "/opt/bridge"),
            ("SWEEP_MAX_RETRIES", "5"),
            ("SWEEP_MAX_RETRY_WAIT_SECS", "600"),
        ])
        .unwrap();

        assert_eq!(config.bridge.program, "node");
        assert_eq!(config.bridge.args, vec!["dist/bridge.js", "--quiet"]);
        assert_eq!(config.bridge.working_dir, Some(PathBuf::from("/opt/bridge")));
        assert_eq!(config.settings.retry.max_retries, Some(5));
        assert_eq!(
            config.settings.retry.max_total_wait,
            Some(Duration::from_secs(600))
        );
    }

    #[test]
    fn test_malformed_number_is_rejected() {
        let err = load(&[
            ("SWEEP_DATA_DIR", "/tmp/sweep-test"),
            ("SWEEP_MAX_RETRIES", "lots"),
        ])
        .unwrap_err();
        assert!(matches!(err, WorkerError::Config(_)));
    }
}
