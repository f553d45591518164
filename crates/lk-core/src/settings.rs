//! Layered runtime configuration for the supervisor.
//!
//! Resolution applies three layers in order: the built-in default table, the
//! on-disk settings store (`conf/lenskeeper.toml`), and `--option value`
//! overrides from argv. The resolved [`Settings`] snapshot is immutable for
//! the rest of the process lifetime; every component reads from it, nobody
//! writes to it.
//!
//! The option set is a statically declared table, not something discovered at
//! runtime: the same table drives defaults, coercion and `--help` output.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

/// File name of the settings store inside the default configuration
/// directory. The store location is fixed relative to the working directory
/// (like the original settings module, it is found next to the program, not
/// through `CONF_PATH`, which the store itself may override).
pub const SETTINGS_STORE_FILE: &str = "conf/lenskeeper.toml";

// ---------------------------------------------------------------------------
// LogLevel
// ---------------------------------------------------------------------------

/// Verbosity threshold for the daemon's log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// Parse a level name, case-insensitively. Returns `None` for anything
    /// that is not one of the five level names.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" => Some(Self::Warn),
            "error" => Some(Self::Error),
            "fatal" => Some(Self::Fatal),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }

    /// The `tracing` filter directive for this level. `tracing` has no fatal
    /// level, so `Fatal` collapses to `error`.
    pub fn filter_directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error | Self::Fatal => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SettingValue
// ---------------------------------------------------------------------------

/// A typed configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Level(LogLevel),
}

impl SettingValue {
    /// Type name as shown in `--help` output.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "str",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::Level(_) => "level",
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid value '{value}' for option --{option}: expected {expected}")]
    BadValue {
        option: String,
        value: String,
        expected: &'static str,
    },
    #[error("option --{0} requires a value")]
    MissingValue(String),
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// The statically declared option table: every recognised key with its
/// default value (which also fixes the key's type for coercion).
fn default_table() -> Vec<(&'static str, SettingValue)> {
    use SettingValue::{Bool, Int, Level, Str};
    vec![
        ("PROJECT_PATH", Str(".".into())),
        ("TEMPLATE_PATH", Str("./templates".into())),
        ("STATIC_PATH", Str("./static".into())),
        ("STATIC_URL", Str("/static/".into())),
        ("CONF_PATH", Str("./conf".into())),
        ("RUN_PATH", Str("./run".into())),
        ("LOG_LEVEL", Level(LogLevel::Info)),
        ("LISTEN", Str("0.0.0.0".into())),
        ("PORT", Int(8765)),
        ("SMB_SHARES", Bool(false)),
        ("MOUNT_CHECK_INTERVAL", Int(300)),
        ("MOTION_CHECK_INTERVAL", Int(10)),
        ("CLEANUP_INTERVAL", Int(43200)),
        ("THUMBNAILER_INTERVAL", Int(60)),
        ("REMOTE_REQUEST_TIMEOUT", Int(10)),
        ("MJPG_CLIENT_TIMEOUT", Int(10)),
        ("PICTURE_CACHE_SIZE", Int(8)),
        ("PICTURE_CACHE_LIFETIME", Int(60)),
    ]
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Outcome of configuration resolution.
#[derive(Debug)]
pub enum Resolution {
    /// `--help` was requested; the caller prints the option enumeration and
    /// exits successfully before any other startup step.
    Help,
    /// Normal resolution. `command` carries the first unrecognised override
    /// name, repurposed as a sub-command token; when it is set, no further
    /// argv entries were processed.
    Run {
        settings: Settings,
        command: Option<String>,
    },
}

/// The resolved configuration snapshot.
///
/// Keys are `ALL_UPPERCASE` option names; the map always contains exactly
/// the keys of the default table.
#[derive(Debug, Clone)]
pub struct Settings {
    values: BTreeMap<String, SettingValue>,
}

impl Settings {
    /// A snapshot holding only the built-in defaults.
    pub fn defaults() -> Self {
        let values = default_table()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Self { values }
    }

    /// Resolve configuration from the default settings store and `argv`
    /// (program name already stripped).
    pub fn resolve(argv: &[String]) -> Result<Resolution, SettingsError> {
        Self::resolve_with_store(argv, Some(Path::new(SETTINGS_STORE_FILE)))
    }

    /// Resolve with an explicit settings-store path (or none). Split out so
    /// tests can point the store at a fixture.
    pub fn resolve_with_store(
        argv: &[String],
        store: Option<&Path>,
    ) -> Result<Resolution, SettingsError> {
        let mut settings = Self::defaults();

        if let Some(path) = store {
            settings.apply_store(path);
        }

        match settings.apply_argv(argv)? {
            ArgvOutcome::Help => Ok(Resolution::Help),
            ArgvOutcome::Command(cmd) => Ok(Resolution::Run {
                settings,
                command: Some(cmd),
            }),
            ArgvOutcome::Completed => {
                settings.ensure_directories();
                Ok(Resolution::Run {
                    settings,
                    command: None,
                })
            }
        }
    }

    /// Look up a value by its `ALL_UPPERCASE` key.
    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values.get(key)
    }

    /// Iterate all options in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    // -- layer application --------------------------------------------------

    /// Overlay the on-disk settings store. Unknown keys and uncoercible
    /// values are warned and skipped: the store is user-managed data, not a
    /// startup contract like argv.
    fn apply_store(&mut self, path: &Path) {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => return, // no store file is the common case
        };
        let table: toml::Table = match text.parse() {
            Ok(table) => table,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unparseable settings store");
                return;
            }
        };

        for (raw_key, value) in table {
            let key = normalize_key(&raw_key);
            if !self.values.contains_key(&key) {
                warn!(key = %raw_key, "ignoring unknown key in settings store");
                continue;
            }
            let coerced = match value {
                toml::Value::Boolean(b) => Some(SettingValue::Bool(b)),
                toml::Value::Integer(i) => Some(SettingValue::Int(i)),
                toml::Value::Float(f) => Some(SettingValue::Float(f)),
                toml::Value::String(s) => match self.coerce(&key, &s) {
                    Ok(v) => Some(v),
                    Err(e) => {
                        warn!(key = %raw_key, error = %e, "ignoring bad value in settings store");
                        None
                    }
                },
                other => {
                    warn!(key = %raw_key, kind = other.type_str(), "ignoring non-scalar value in settings store");
                    None
                }
            };
            if let Some(v) = coerced {
                self.values.insert(key, v);
            }
        }
    }

    /// Apply `--name value` / `--name=value` overrides in argv order.
    ///
    /// An unknown option name halts parsing and becomes the leftover command
    /// token. Tokens not starting with `--` are skipped.
    fn apply_argv(&mut self, argv: &[String]) -> Result<ArgvOutcome, SettingsError> {
        let mut i = 0;
        while i < argv.len() {
            let token = &argv[i];
            let Some(body) = token.strip_prefix("--") else {
                i += 1;
                continue;
            };

            let (raw_name, inline_value) = match body.split_once('=') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (body, None),
            };
            let key = normalize_key(raw_name);

            if key == "HELP" {
                return Ok(ArgvOutcome::Help);
            }

            if !self.values.contains_key(&key) {
                // Leftover command token: halt override processing here.
                return Ok(ArgvOutcome::Command(body.to_string()));
            }

            let (value, consumed) = match inline_value {
                Some(v) => (v, 1),
                None => match argv.get(i + 1) {
                    Some(v) => (v.clone(), 2),
                    None => return Err(SettingsError::MissingValue(raw_name.to_string())),
                },
            };

            let coerced = self.coerce(&key, &value)?;
            self.values.insert(key, coerced);
            i += consumed;
        }
        Ok(ArgvOutcome::Completed)
    }

    /// Coerce an override string for `key`. Level names and booleans are
    /// recognised regardless of the key's current type; everything else
    /// follows the pre-existing type of the key.
    fn coerce(&self, key: &str, value: &str) -> Result<SettingValue, SettingsError> {
        if let Some(level) = LogLevel::parse(value) {
            return Ok(SettingValue::Level(level));
        }
        match value.to_ascii_lowercase().as_str() {
            "true" => return Ok(SettingValue::Bool(true)),
            "false" => return Ok(SettingValue::Bool(false)),
            _ => {}
        }

        let bad = |expected| SettingsError::BadValue {
            option: key.to_ascii_lowercase().replace('_', "-"),
            value: value.to_string(),
            expected,
        };
        match self.values.get(key) {
            Some(SettingValue::Int(_)) => value
                .parse::<i64>()
                .map(SettingValue::Int)
                .map_err(|_| bad("an integer")),
            Some(SettingValue::Float(_)) => value
                .parse::<f64>()
                .map(SettingValue::Float)
                .map_err(|_| bad("a number")),
            Some(SettingValue::Bool(_)) => Err(bad("a boolean")),
            Some(SettingValue::Level(_)) => Err(bad("a log level")),
            _ => Ok(SettingValue::Str(value.to_string())),
        }
    }

    /// Create the configuration and runtime directories. Best effort: they
    /// may already exist or be externally managed, so failure is swallowed.
    fn ensure_directories(&self) {
        let _ = std::fs::create_dir_all(self.conf_path());
        let _ = std::fs::create_dir_all(self.run_path());
    }

    // -- typed accessors -----------------------------------------------------

    pub fn conf_path(&self) -> PathBuf {
        self.path_value("CONF_PATH")
    }

    pub fn run_path(&self) -> PathBuf {
        self.path_value("RUN_PATH")
    }

    pub fn static_path(&self) -> PathBuf {
        self.path_value("STATIC_PATH")
    }

    pub fn static_url(&self) -> String {
        self.str_value("STATIC_URL")
    }

    pub fn listen(&self) -> String {
        self.str_value("LISTEN")
    }

    pub fn port(&self) -> u16 {
        self.int_value("PORT").clamp(0, u16::MAX as i64) as u16
    }

    pub fn log_level(&self) -> LogLevel {
        match self.values.get("LOG_LEVEL") {
            Some(SettingValue::Level(level)) => *level,
            _ => LogLevel::Info,
        }
    }

    pub fn smb_shares(&self) -> bool {
        matches!(self.values.get("SMB_SHARES"), Some(SettingValue::Bool(true)))
    }

    pub fn motion_check_interval(&self) -> u64 {
        self.int_value("MOTION_CHECK_INTERVAL").max(0) as u64
    }

    pub fn mount_check_interval(&self) -> u64 {
        self.int_value("MOUNT_CHECK_INTERVAL").max(0) as u64
    }

    pub fn cleanup_interval(&self) -> u64 {
        self.int_value("CLEANUP_INTERVAL").max(0) as u64
    }

    pub fn thumbnailer_interval(&self) -> u64 {
        self.int_value("THUMBNAILER_INTERVAL").max(0) as u64
    }

    fn str_value(&self, key: &str) -> String {
        match self.values.get(key) {
            Some(SettingValue::Str(s)) => s.clone(),
            _ => String::new(),
        }
    }

    fn path_value(&self, key: &str) -> PathBuf {
        PathBuf::from(self.str_value(key))
    }

    fn int_value(&self, key: &str) -> i64 {
        match self.values.get(key) {
            Some(SettingValue::Int(i)) => *i,
            _ => 0,
        }
    }
}

/// `--help` output: every public option name (`ALL_UPPERCASE`,
/// underscore/alphanumeric only), sorted, in dashed-lowercase form with its
/// inferred type name.
pub fn help_text() -> String {
    let mut out = String::from("available options:\n");
    for (key, value) in Settings::defaults().iter() {
        if !is_public_key(key) {
            continue;
        }
        let name = key.to_ascii_lowercase().replace('_', "-");
        out.push_str(&format!("    --{} <{}>\n", name, value.type_name()));
    }
    out
}

fn is_public_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Map an option name to its `ALL_UPPERCASE` key form.
fn normalize_key(name: &str) -> String {
    name.to_ascii_uppercase().replace('-', "_")
}

/// How an argv pass ended.
enum ArgvOutcome {
    /// Every token processed.
    Completed,
    /// The reserved help option was seen.
    Help,
    /// An unknown option halted parsing; carries the leftover token.
    Command(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_parses_any_case() {
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("Fatal"), Some(LogLevel::Fatal));
        assert_eq!(LogLevel::parse("verbose"), None);
    }

    #[test]
    fn fatal_collapses_to_error_directive() {
        assert_eq!(LogLevel::Fatal.filter_directive(), "error");
        assert_eq!(LogLevel::Warn.filter_directive(), "warn");
    }

    #[test]
    fn normalize_key_uppercases_and_replaces_dashes() {
        assert_eq!(normalize_key("log-level"), "LOG_LEVEL");
        assert_eq!(normalize_key("PORT"), "PORT");
    }

    #[test]
    fn defaults_contain_every_table_key() {
        let settings = Settings::defaults();
        for (key, _) in default_table() {
            assert!(settings.get(key).is_some(), "missing default for {key}");
        }
        assert_eq!(settings.port(), 8765);
        assert_eq!(settings.log_level(), LogLevel::Info);
        assert!(!settings.smb_shares());
    }

    #[test]
    fn is_public_key_enforces_naming_rule() {
        assert!(is_public_key("LOG_LEVEL"));
        assert!(is_public_key("PORT"));
        assert!(!is_public_key("lower_case"));
        assert!(!is_public_key("BAD-KEY"));
        assert!(!is_public_key(""));
    }
}
