//! Harness configuration loading and resolution.
//!
//! Configuration comes from a JSON file with per-field defaults;
//! `WDH_*` environment variables override file values so CI can steer
//! a run without editing it.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wd_protocol::Timeouts;

use crate::error::{HarnessError, Result};

fn default_browser() -> String {
	"chrome".to_string()
}

fn default_environment() -> String {
	"qa".to_string()
}

fn default_true() -> bool {
	true
}

fn default_implicit_wait() -> u64 {
	10
}

fn default_explicit_wait() -> u64 {
	20
}

fn default_page_load_timeout() -> u64 {
	30
}

fn default_script_timeout() -> u64 {
	15
}

fn default_retry_count() -> u32 {
	1
}

fn default_grid_url() -> String {
	"http://localhost:4444".to_string()
}

fn default_workers() -> usize {
	5
}

fn default_output_dir() -> PathBuf {
	PathBuf::from("test-output")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HarnessConfig {
	/// Browser name as configured; validated against the supported set
	/// at session acquisition, not at load time.
	#[serde(default = "default_browser")]
	pub browser: String,
	/// Run browsers headless. Headful sessions get a maximized window.
	pub headless: bool,
	/// Active environment name used to pick the base URL.
	#[serde(default = "default_environment")]
	pub environment: String,
	/// Environment name -> application URL.
	pub environment_urls: HashMap<String, String>,
	/// Explicit base URL override; wins over `environment_urls`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub base_url: Option<String>,
	#[serde(default = "default_implicit_wait")]
	pub implicit_wait_secs: u64,
	#[serde(default = "default_explicit_wait")]
	pub explicit_wait_secs: u64,
	#[serde(default = "default_page_load_timeout")]
	pub page_load_timeout_secs: u64,
	#[serde(default = "default_script_timeout")]
	pub script_timeout_secs: u64,
	/// Master switch for retries; false forces max_retries to 0.
	#[serde(default = "default_true")]
	pub retry_enabled: bool,
	#[serde(default = "default_retry_count")]
	pub retry_count: u32,
	#[serde(default = "default_true")]
	pub screenshot_on_fail: bool,
	pub screenshot_on_pass: bool,
	/// Run against a remote grid instead of a local driver.
	pub remote: bool,
	#[serde(default = "default_grid_url")]
	pub grid_url: String,
	/// Parallel worker count for suite execution.
	#[serde(default = "default_workers")]
	pub workers: usize,
	/// Root for screenshots and reports.
	#[serde(default = "default_output_dir")]
	pub output_dir: PathBuf,
}

impl Default for HarnessConfig {
	fn default() -> Self {
		Self {
			browser: default_browser(),
			headless: false,
			environment: default_environment(),
			environment_urls: HashMap::new(),
			base_url: None,
			implicit_wait_secs: default_implicit_wait(),
			explicit_wait_secs: default_explicit_wait(),
			page_load_timeout_secs: default_page_load_timeout(),
			script_timeout_secs: default_script_timeout(),
			retry_enabled: true,
			retry_count: default_retry_count(),
			screenshot_on_fail: true,
			screenshot_on_pass: false,
			remote: false,
			grid_url: default_grid_url(),
			workers: default_workers(),
			output_dir: default_output_dir(),
		}
	}
}

impl HarnessConfig {
	/// Loads configuration from a JSON file, then applies `WDH_*`
	/// environment overrides. A missing file yields pure defaults.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let mut config = match fs::read_to_string(path) {
			Ok(content) => serde_json::from_str(&content)?,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
				debug!(target = "harness.config", path = %path.display(), "config file missing; using defaults");
				Self::default()
			}
			Err(err) => return Err(HarnessError::Io(err)),
		};
		config.apply_env_overrides();
		Ok(config)
	}

	/// Applies environment-variable overrides onto already-loaded values.
	pub fn apply_env_overrides(&mut self) {
		self.apply_overrides(env_var);
	}

	fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
		if let Some(v) = lookup("WDH_BROWSER") {
			self.browser = v;
		}
		if let Some(v) = lookup("WDH_HEADLESS") {
			self.headless = parse_bool("WDH_HEADLESS", &v).unwrap_or(self.headless);
		}
		if let Some(v) = lookup("WDH_ENVIRONMENT") {
			self.environment = v;
		}
		if let Some(v) = lookup("WDH_BASE_URL") {
			self.base_url = Some(v);
		}
		if let Some(v) = lookup("WDH_RETRY_ENABLED") {
			self.retry_enabled = parse_bool("WDH_RETRY_ENABLED", &v).unwrap_or(self.retry_enabled);
		}
		if let Some(v) = lookup("WDH_RETRY_COUNT") {
			match v.parse() {
				Ok(count) => self.retry_count = count,
				Err(_) => warn!(target = "harness.config", value = %v, "ignoring non-numeric WDH_RETRY_COUNT"),
			}
		}
		if let Some(v) = lookup("WDH_REMOTE") {
			self.remote = parse_bool("WDH_REMOTE", &v).unwrap_or(self.remote);
		}
		if let Some(v) = lookup("WDH_GRID_URL") {
			self.grid_url = v;
		}
		if let Some(v) = lookup("WDH_WORKERS") {
			match v.parse() {
				Ok(workers) => self.workers = workers,
				Err(_) => warn!(target = "harness.config", value = %v, "ignoring non-numeric WDH_WORKERS"),
			}
		}
	}

	/// Effective retry budget. Read once per policy instance.
	pub fn max_retries(&self) -> u32 {
		if self.retry_enabled { self.retry_count } else { 0 }
	}

	/// Application URL for the active environment, when configured.
	pub fn resolved_url(&self) -> Option<&str> {
		if let Some(url) = self.base_url.as_deref() {
			return Some(url);
		}
		let url = self.environment_urls.get(&self.environment).map(String::as_str);
		if url.is_none() && !self.environment_urls.is_empty() {
			warn!(target = "harness.config", environment = %self.environment, "no URL configured for environment");
		}
		url
	}

	/// Timeouts applied to every freshly opened session.
	pub fn timeouts(&self) -> Timeouts {
		Timeouts {
			implicit_wait_secs: self.implicit_wait_secs,
			explicit_wait_secs: self.explicit_wait_secs,
			page_load_secs: self.page_load_timeout_secs,
			script_secs: self.script_timeout_secs,
		}
	}

	/// Directory for captured screenshots.
	pub fn screenshots_dir(&self) -> PathBuf {
		self.output_dir.join("screenshots")
	}

	/// Directory for flushed report documents.
	pub fn reports_dir(&self) -> PathBuf {
		self.output_dir.join("reports")
	}

	/// Creates the output directory tree.
	pub fn ensure_output_dirs(&self) -> Result<()> {
		fs::create_dir_all(self.screenshots_dir())?;
		fs::create_dir_all(self.reports_dir())?;
		Ok(())
	}
}

fn env_var(key: &str) -> Option<String> {
	std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_bool(key: &str, value: &str) -> Option<bool> {
	match value.to_ascii_lowercase().as_str() {
		"true" | "1" | "yes" => Some(true),
		"false" | "0" | "no" => Some(false),
		_ => {
			warn!(target = "harness.config", key, value, "ignoring non-boolean override");
			None
		}
	}
}

#[cfg(test)]
mod tests {
	use tempfile::tempdir;

	use super::*;

	#[test]
	fn defaults_match_framework_conventions() {
		let config = HarnessConfig::default();
		assert_eq!(config.browser, "chrome");
		assert!(!config.headless);
		assert_eq!(config.environment, "qa");
		assert_eq!(config.implicit_wait_secs, 10);
		assert_eq!(config.page_load_timeout_secs, 30);
		assert_eq!(config.retry_count, 1);
		assert!(config.retry_enabled);
		assert!(config.screenshot_on_fail);
		assert!(!config.screenshot_on_pass);
		assert_eq!(config.workers, 5);
	}

	#[test]
	fn missing_file_yields_defaults() {
		let dir = tempdir().unwrap();
		let config = HarnessConfig::load(&dir.path().join("absent.json")).unwrap();
		assert_eq!(config.browser, "chrome");
	}

	#[test]
	fn partial_file_keeps_defaults_for_missing_fields() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("config.json");
		fs::write(&path, r#"{"browser":"firefox","retryCount":3}"#).unwrap();

		let config = HarnessConfig::load(&path).unwrap();
		assert_eq!(config.browser, "firefox");
		assert_eq!(config.retry_count, 3);
		assert_eq!(config.implicit_wait_secs, 10);
	}

	#[test]
	fn overrides_win_over_loaded_values() {
		let vars = HashMap::from([
			("WDH_BROWSER".to_string(), "firefox".to_string()),
			("WDH_HEADLESS".to_string(), "true".to_string()),
			("WDH_RETRY_COUNT".to_string(), "3".to_string()),
			("WDH_REMOTE".to_string(), "yes".to_string()),
			("WDH_GRID_URL".to_string(), "http://grid.internal:4444".to_string()),
			("WDH_BASE_URL".to_string(), "https://qa.example.com".to_string()),
		]);

		let mut config = HarnessConfig::default();
		config.apply_overrides(|key| vars.get(key).cloned());

		assert_eq!(config.browser, "firefox");
		assert!(config.headless);
		assert_eq!(config.retry_count, 3);
		assert!(config.remote);
		assert_eq!(config.grid_url, "http://grid.internal:4444");
		assert_eq!(config.resolved_url(), Some("https://qa.example.com"));
	}

	#[test]
	fn malformed_overrides_keep_existing_values() {
		let vars = HashMap::from([
			("WDH_RETRY_COUNT".to_string(), "lots".to_string()),
			("WDH_HEADLESS".to_string(), "maybe".to_string()),
			("WDH_WORKERS".to_string(), "-2".to_string()),
		]);

		let mut config = HarnessConfig::default();
		config.apply_overrides(|key| vars.get(key).cloned());

		assert_eq!(config.retry_count, 1);
		assert!(!config.headless);
		assert_eq!(config.workers, 5);
	}

	#[test]
	fn absent_overrides_change_nothing() {
		let mut config = HarnessConfig::default();
		config.apply_overrides(|_| None);
		assert_eq!(config.browser, "chrome");
		assert_eq!(config.retry_count, 1);
	}

	#[test]
	fn retry_disabled_forces_zero_budget() {
		let config = HarnessConfig {
			retry_enabled: false,
			retry_count: 4,
			..HarnessConfig::default()
		};
		assert_eq!(config.max_retries(), 0);
	}

	#[test]
	fn base_url_wins_over_environment_map() {
		let mut config = HarnessConfig::default();
		config.environment_urls.insert("qa".into(), "https://qa.example.com".into());
		assert_eq!(config.resolved_url(), Some("https://qa.example.com"));

		config.base_url = Some("https://override.example.com".into());
		assert_eq!(config.resolved_url(), Some("https://override.example.com"));
	}

	#[test]
	fn unknown_environment_resolves_to_none() {
		let mut config = HarnessConfig::default();
		config.environment = "stage".into();
		config.environment_urls.insert("qa".into(), "https://qa.example.com".into());
		assert_eq!(config.resolved_url(), None);
	}

	#[test]
	fn ensure_output_dirs_creates_tree() {
		let dir = tempdir().unwrap();
		let config = HarnessConfig {
			output_dir: dir.path().join("out"),
			..HarnessConfig::default()
		};
		config.ensure_output_dirs().unwrap();
		assert!(config.screenshots_dir().is_dir());
		assert!(config.reports_dir().is_dir());
	}
}
