//! Configuration loading for tickbridge.
//!
//! Raw TOML structs (all fields optional) stay private here and are resolved
//! into validated types at the parse boundary via `#[serde(try_from)]`. A
//! missing config file is not an error: every field has a default.
//!
//! Lookup order:
//! 1. the path given on the command line
//! 2. `$TICKBRIDGE_CONFIG`
//! 3. `./tickbridge.toml`
//! 4. `~/.tickbridge/config.toml`
//!
//! `$TICKBRIDGE_TEST_DIR` overrides `[run].test_dir` after loading.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_ENV: &str = "TICKBRIDGE_CONFIG";
pub const TEST_DIR_ENV: &str = "TICKBRIDGE_TEST_DIR";
pub const LOCAL_CONFIG_FILE: &str = "tickbridge.toml";

const DEFAULT_TEST_DIR: &str = "run/test";
const DEFAULT_TICK_INTERVAL_MS: u64 = 50;
const DEFAULT_MARKER: &str = "host-loop";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("host.tick_interval_ms must be greater than zero")]
    ZeroTickInterval,
    #[error("discovery.marker must not be empty")]
    EmptyMarker,
    #[error("run.test_dir must not be empty")]
    EmptyTestDir,
}

// ============================================================================
// Raw TOML shapes
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRunConfig {
    test_dir: Option<String>,
    #[serde(default)]
    accept_eula: bool,
    #[serde(default)]
    fail_on_test_failure: bool,
    #[serde(default)]
    log_to_file: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHostConfig {
    tick_interval_ms: Option<u64>,
    shutdown_timeout_ms: Option<u64>,
    work_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDiscoveryConfig {
    marker: Option<String>,
}

// ============================================================================
// Resolved configuration
// ============================================================================

/// `[run]`: where the harness runs and how results affect the exit code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawRunConfig")]
pub struct RunConfig {
    test_dir: PathBuf,
    accept_eula: bool,
    fail_on_test_failure: bool,
    log_to_file: bool,
}

impl TryFrom<RawRunConfig> for RunConfig {
    type Error = ValueError;

    fn try_from(raw: RawRunConfig) -> Result<Self, Self::Error> {
        let test_dir = match raw.test_dir {
            Some(dir) if dir.trim().is_empty() => return Err(ValueError::EmptyTestDir),
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from(DEFAULT_TEST_DIR),
        };
        Ok(Self {
            test_dir,
            accept_eula: raw.accept_eula,
            fail_on_test_failure: raw.fail_on_test_failure,
            log_to_file: raw.log_to_file,
        })
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            test_dir: PathBuf::from(DEFAULT_TEST_DIR),
            accept_eula: false,
            fail_on_test_failure: false,
            log_to_file: false,
        }
    }
}

impl RunConfig {
    /// Working directory for the test run, relative to the launch directory
    /// unless absolute.
    #[must_use]
    pub fn test_dir(&self) -> &Path {
        &self.test_dir
    }

    #[must_use]
    pub fn accept_eula(&self) -> bool {
        self.accept_eula
    }

    #[must_use]
    pub fn fail_on_test_failure(&self) -> bool {
        self.fail_on_test_failure
    }

    #[must_use]
    pub fn log_to_file(&self) -> bool {
        self.log_to_file
    }

    #[must_use]
    pub fn with_test_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.test_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_accept_eula(mut self, accept: bool) -> Self {
        self.accept_eula = accept;
        self
    }

    #[must_use]
    pub fn with_fail_on_test_failure(mut self, fail: bool) -> Self {
        self.fail_on_test_failure = fail;
        self
    }
}

/// `[host]`: host loop cadence and optional bounded waits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawHostConfig")]
pub struct HostConfig {
    tick_interval: Duration,
    shutdown_timeout: Option<Duration>,
    work_timeout: Option<Duration>,
}

impl TryFrom<RawHostConfig> for HostConfig {
    type Error = ValueError;

    fn try_from(raw: RawHostConfig) -> Result<Self, Self::Error> {
        let tick_ms = raw.tick_interval_ms.unwrap_or(DEFAULT_TICK_INTERVAL_MS);
        if tick_ms == 0 {
            return Err(ValueError::ZeroTickInterval);
        }
        Ok(Self {
            tick_interval: Duration::from_millis(tick_ms),
            shutdown_timeout: raw.shutdown_timeout_ms.map(Duration::from_millis),
            work_timeout: raw.work_timeout_ms.map(Duration::from_millis),
        })
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            shutdown_timeout: None,
            work_timeout: None,
        }
    }
}

impl HostConfig {
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    #[must_use]
    pub fn shutdown_timeout(&self) -> Option<Duration> {
        self.shutdown_timeout
    }

    #[must_use]
    pub fn work_timeout(&self) -> Option<Duration> {
        self.work_timeout
    }
}

/// `[discovery]`: which runner marker selects host-loop suites.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawDiscoveryConfig")]
pub struct DiscoveryConfig {
    marker: String,
}

impl TryFrom<RawDiscoveryConfig> for DiscoveryConfig {
    type Error = ValueError;

    fn try_from(raw: RawDiscoveryConfig) -> Result<Self, Self::Error> {
        match raw.marker {
            Some(marker) if marker.trim().is_empty() => Err(ValueError::EmptyMarker),
            Some(marker) => Ok(Self { marker }),
            None => Ok(Self::default()),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
        }
    }
}

impl DiscoveryConfig {
    #[must_use]
    pub fn marker(&self) -> &str {
        &self.marker
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TickbridgeConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl TickbridgeConfig {
    /// Load from the standard locations. Missing files yield defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let home = dirs::home_dir();
        let lookup = |key: &str| env::var(key).ok();
        Self::load_from(explicit, &lookup, &cwd, home.as_deref())
    }

    /// [`load`](Self::load) with the environment, working directory and home
    /// directory supplied by the caller.
    pub fn load_from(
        explicit: Option<&Path>,
        env: &dyn Fn(&str) -> Option<String>,
        cwd: &Path,
        home: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut config = match locate(explicit, env, cwd, home) {
            Some(path) => Self::read(&path)?,
            None => {
                tracing::debug!("No config file found; using defaults");
                Self::default()
            }
        };

        if let Some(dir) = env(TEST_DIR_ENV).filter(|dir| !dir.trim().is_empty()) {
            tracing::debug!(test_dir = %dir, "Test directory overridden from environment");
            config.run.test_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "Loaded config");
                Ok(config)
            }
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }
}

/// The config file [`TickbridgeConfig::load`] would read, as an absolute path.
#[must_use]
pub fn resolve_source(explicit: Option<&Path>) -> Option<PathBuf> {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let home = dirs::home_dir();
    let lookup = |key: &str| env::var(key).ok();
    locate(explicit, &lookup, &cwd, home.as_deref()).map(|path| cwd.join(path))
}

/// The config file to read, if any.
///
/// An explicit path (argument or `$TICKBRIDGE_CONFIG`) is returned even if it
/// does not exist, so a typo surfaces as a read error instead of silently
/// falling back to defaults.
#[must_use]
pub fn locate(
    explicit: Option<&Path>,
    env: &dyn Fn(&str) -> Option<String>,
    cwd: &Path,
    home: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env(CONFIG_ENV).filter(|path| !path.trim().is_empty()) {
        return Some(PathBuf::from(path));
    }
    let local = cwd.join(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }
    home.map(user_config_path).filter(|path| path.is_file())
}

#[must_use]
pub fn user_config_path(home: &Path) -> PathBuf {
    home.join(".tickbridge").join("config.toml")
}
