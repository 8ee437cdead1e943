//! Configuration loading.
//!
//! Precedence, highest first: CLI flags, environment variables, a
//! project-local `.n8nctl.toml`, `~/.n8nctl.toml`, and the XDG config
//! directory. Files are TOML with optional named profiles, or legacy flat
//! `KEY=value` lines. Files carrying an API key must be mode 0600 in
//! strict-permissions mode.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cli::GlobalOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {message}")]
    Invalid { message: String },

    #[error("config file {path} is readable by other users; fix with chmod 600")]
    LoosePermissions { path: String },
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        "CONFIG_INVALID"
    }
}

/// One profile's worth of settings as stored on disk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileProfile {
    pub host: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Option<u64>,
    pub strict_permissions: Option<bool>,
    pub ssrf_guard: Option<String>,
    pub data_dir: Option<String>,
    pub nodes_db: Option<String>,
}

/// Structured config file shape.
#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
    #[serde(flatten)]
    base: FileProfile,
    default_profile: Option<String>,
    #[serde(default)]
    profiles: BTreeMap<String, FileProfile>,
}

/// Effective settings after precedence resolution.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub debug: bool,
    pub strict_permissions: bool,
    pub ssrf_guard: String,
    pub data_dir: PathBuf,
    pub nodes_db: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: None,
            api_key: None,
            timeout: Duration::from_secs(30),
            debug: false,
            strict_permissions: false,
            ssrf_guard: "strict".to_string(),
            data_dir: default_data_dir(),
            nodes_db: None,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("n8nctl")
}

/// Candidate config files, lowest precedence first.
fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("n8nctl").join("config.toml"));
    }
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".n8nctl.toml"));
    }
    paths.push(PathBuf::from(".n8nctl.toml"));
    paths
}

/// Load settings with full precedence applied.
pub fn load(global: &GlobalOptions) -> Result<Settings, ConfigError> {
    let profile_name = global
        .profile
        .clone()
        .or_else(|| std::env::var("N8N_PROFILE").ok());
    load_from(global, profile_name.as_deref(), &config_paths())
}

/// Testable core: lowest-precedence files first.
pub fn load_from(
    global: &GlobalOptions,
    profile_name: Option<&str>,
    paths: &[PathBuf],
) -> Result<Settings, ConfigError> {
    let mut settings = Settings::default();
    let strict_env = env_bool("N8N_STRICT_PERMISSIONS");

    for path in paths {
        if !path.exists() {
            continue;
        }
        let file = parse_file(path)?;
        let strict_now = strict_env
            .or(file.base.strict_permissions)
            .unwrap_or(settings.strict_permissions);
        let selected = profile_name
            .map(String::from)
            .or_else(|| file.default_profile.clone());

        apply_profile(&mut settings, &file.base, path, strict_now)?;
        if let Some(name) = &selected {
            if let Some(profile) = file.profiles.get(name) {
                apply_profile(&mut settings, profile, path, strict_now)?;
            }
        }
        debug!(path = %path.display(), "loaded config file");
    }

    // A named profile must exist somewhere when explicitly requested.
    if let Some(name) = profile_name {
        let found = paths.iter().filter(|p| p.exists()).any(|p| {
            parse_file(p)
                .map(|f| f.profiles.contains_key(name))
                .unwrap_or(false)
        });
        if !found {
            return Err(ConfigError::Invalid {
                message: format!("profile '{name}' not found in any config file"),
            });
        }
    }

    // Environment overrides files.
    if let Ok(host) = std::env::var("N8N_HOST") {
        settings.host = Some(host);
    }
    if let Ok(key) = std::env::var("N8N_API_KEY") {
        settings.api_key = Some(key);
    }
    if let Ok(timeout) = std::env::var("N8N_TIMEOUT") {
        let seconds: u64 = timeout.parse().map_err(|_| ConfigError::Invalid {
            message: format!("N8N_TIMEOUT must be a number of seconds, got '{timeout}'"),
        })?;
        settings.timeout = Duration::from_secs(seconds);
    }
    if let Some(debug) = env_bool("N8N_DEBUG") {
        settings.debug = debug;
    }
    if let Some(strict) = strict_env {
        settings.strict_permissions = strict;
    }

    // CLI flags override everything.
    if let Some(host) = &global.host {
        settings.host = Some(host.clone());
    }
    if let Some(key) = &global.api_key {
        settings.api_key = Some(key.clone());
    }
    if let Some(timeout) = global.timeout {
        settings.timeout = Duration::from_secs(timeout);
    }
    if global.verbose {
        settings.debug = true;
    }

    settings.timeout = settings.timeout.min(n8nctl_api::MAX_TIMEOUT);
    Ok(settings)
}

fn apply_profile(
    settings: &mut Settings,
    profile: &FileProfile,
    path: &Path,
    strict: bool,
) -> Result<(), ConfigError> {
    if profile.api_key.is_some() {
        check_secret_permissions(path, strict)?;
    }
    if let Some(host) = &profile.host {
        settings.host = Some(host.clone());
    }
    if let Some(key) = &profile.api_key {
        settings.api_key = Some(key.clone());
    }
    if let Some(timeout) = profile.timeout {
        settings.timeout = Duration::from_secs(timeout);
    }
    if let Some(strict_permissions) = profile.strict_permissions {
        settings.strict_permissions = strict_permissions;
    }
    if let Some(guard) = &profile.ssrf_guard {
        settings.ssrf_guard = guard.clone();
    }
    if let Some(data_dir) = &profile.data_dir {
        settings.data_dir = PathBuf::from(data_dir);
    }
    if let Some(nodes_db) = &profile.nodes_db {
        settings.nodes_db = Some(PathBuf::from(nodes_db));
    }
    Ok(())
}

/// TOML first; legacy flat `KEY=value` lines as fallback.
fn parse_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Invalid {
        message: format!("cannot read {}: {e}", path.display()),
    })?;

    match toml::from_str::<FileConfig>(&raw) {
        Ok(config) => Ok(config),
        Err(toml_err) => parse_flat(&raw).ok_or_else(|| ConfigError::Invalid {
            message: format!("{} is not valid config: {toml_err}", path.display()),
        }),
    }
}

fn parse_flat(raw: &str) -> Option<FileConfig> {
    let mut base = FileProfile::default();
    let mut saw_any = false;
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = line.split_once('=')?;
        let value = value.trim().trim_matches('"').to_string();
        saw_any = true;
        match key.trim().to_ascii_uppercase().as_str() {
            "HOST" | "N8N_HOST" => base.host = Some(value),
            "API_KEY" | "N8N_API_KEY" => base.api_key = Some(value),
            "TIMEOUT" | "N8N_TIMEOUT" => base.timeout = value.parse().ok(),
            "STRICT_PERMISSIONS" => base.strict_permissions = parse_bool(&value),
            "SSRF_GUARD" => base.ssrf_guard = Some(value),
            "DATA_DIR" => base.data_dir = Some(value),
            "NODES_DB" => base.nodes_db = Some(value),
            _ => return None,
        }
    }
    saw_any.then_some(FileConfig {
        base,
        default_profile: None,
        profiles: BTreeMap::new(),
    })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|v| parse_bool(&v))
}

/// Secret-bearing config files must be private to the user.
fn check_secret_permissions(path: &Path, strict: bool) -> Result<(), ConfigError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = std::fs::metadata(path) {
            let mode = metadata.permissions().mode() & 0o777;
            if mode & 0o077 != 0 {
                if strict {
                    return Err(ConfigError::LoosePermissions {
                        path: path.display().to_string(),
                    });
                }
                warn!(
                    path = %path.display(),
                    mode = format!("{mode:o}"),
                    "config file with an API key is readable by other users"
                );
            }
        }
    }
    #[cfg(not(unix))]
    let _ = (path, strict);
    Ok(())
}

/// Redacted view for `config show`.
pub fn redacted(settings: &Settings) -> serde_json::Value {
    serde_json::json!({
        "host": settings.host,
        "apiKey": settings.api_key.as_ref().map(|_| "********"),
        "timeoutSeconds": settings.timeout.as_secs(),
        "strictPermissions": settings.strict_permissions,
        "ssrfGuard": settings.ssrf_guard,
        "dataDir": settings.data_dir.display().to_string(),
        "nodesDb": settings.nodes_db.as_ref().map(|p| p.display().to_string()),
    })
}

/// Starter config written by `config init`.
pub const STARTER_CONFIG: &str = r#"# n8nctl configuration
# host = "https://n8n.example.com"
# api_key = "n8n_api_..."
# timeout = 30
# strict_permissions = false
# ssrf_guard = "strict"

# [profiles.staging]
# host = "https://staging.n8n.example.com"
# api_key = "n8n_api_..."
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn no_flags() -> GlobalOptions {
        GlobalOptions {
            json: false,
            save: None,
            verbose: false,
            quiet: false,
            no_color: false,
            profile: None,
            host: None,
            api_key: None,
            timeout: None,
        }
    }

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
        }
        path
    }

    #[test]
    #[serial]
    fn toml_file_supplies_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "config.toml",
            "host = \"https://a.example.com\"\ntimeout = 10\n",
        );
        let settings = load_from(&no_flags(), None, &[path]).unwrap();
        assert_eq!(settings.host.as_deref(), Some("https://a.example.com"));
        assert_eq!(settings.timeout, Duration::from_secs(10));
    }

    #[test]
    #[serial]
    fn later_files_override_earlier_ones() {
        let dir = tempfile::tempdir().unwrap();
        let low = write(dir.path(), "low.toml", "host = \"https://low.example.com\"\n");
        let high = write(dir.path(), "high.toml", "host = \"https://high.example.com\"\n");
        let settings = load_from(&no_flags(), None, &[low, high]).unwrap();
        assert_eq!(settings.host.as_deref(), Some("https://high.example.com"));
    }

    #[test]
    #[serial]
    fn cli_flags_beat_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "config.toml", "host = \"https://file.example.com\"\n");
        let mut flags = no_flags();
        flags.host = Some("https://flag.example.com".to_string());
        let settings = load_from(&flags, None, &[path]).unwrap();
        assert_eq!(settings.host.as_deref(), Some("https://flag.example.com"));
    }

    #[test]
    #[serial]
    fn named_profile_overrides_base() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "config.toml",
            concat!(
                "host = \"https://prod.example.com\"\n\n",
                "[profiles.staging]\n",
                "host = \"https://staging.example.com\"\n",
            ),
        );
        let settings = load_from(&no_flags(), Some("staging"), &[path]).unwrap();
        assert_eq!(settings.host.as_deref(), Some("https://staging.example.com"));
    }

    #[test]
    #[serial]
    fn missing_profile_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "config.toml", "host = \"https://x.example.com\"\n");
        let err = load_from(&no_flags(), Some("ghost"), &[path]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    #[serial]
    fn flat_key_value_files_still_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "legacy.conf",
            "HOST=https://legacy.example.com\nTIMEOUT=15\n",
        );
        let settings = load_from(&no_flags(), None, &[path]).unwrap();
        assert_eq!(settings.host.as_deref(), Some("https://legacy.example.com"));
        assert_eq!(settings.timeout, Duration::from_secs(15));
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn strict_mode_refuses_world_readable_secrets() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "config.toml",
            "api_key = \"secret\"\nstrict_permissions = true\n",
        );
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        let err = load_from(&no_flags(), None, &[path]).unwrap_err();
        assert!(matches!(err, ConfigError::LoosePermissions { .. }));
    }

    #[test]
    #[serial]
    fn timeout_is_clamped_to_hard_ceiling() {
        let mut flags = no_flags();
        flags.timeout = Some(86_400);
        let settings = load_from(&flags, None, &[]).unwrap();
        assert_eq!(settings.timeout, n8nctl_api::MAX_TIMEOUT);
    }

    #[test]
    #[serial]
    fn redaction_masks_the_api_key() {
        let mut settings = Settings::default();
        settings.api_key = Some("n8n_api_secret".to_string());
        let view = redacted(&settings);
        assert_eq!(view["apiKey"], "********");
    }
}
