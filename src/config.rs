use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Config file picked up from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "formfill.toml";

/// Prefix for environment overrides (`FF_TYPING_INTERVAL`, ...)
pub const ENV_PREFIX: &str = "FF_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FillerConfig {
    // ========================================================================
    // Timing (seconds)
    // ========================================================================
    /// Pause after every dispatched input primitive
    pub pause_between_actions: f64,
    /// Delay between typed characters
    pub typing_interval: f64,
    /// Delay after moving to the next field
    pub field_transition_delay: f64,
    /// Delay after submitting a form
    pub form_submission_delay: f64,
    /// Delay between records
    pub record_delay: f64,
    /// Extra wait for the page to reload after submission
    pub page_load_delay: f64,

    // ========================================================================
    // Behavior
    // ========================================================================
    pub wait_for_page_load: bool,
    /// Select-all before typing so old content gets replaced
    pub clear_fields: bool,
    /// Abort when the pointer is parked in the top-left corner
    pub use_failsafe: bool,
    pub navigation_method: NavigationMethod,
    pub submission_method: SubmissionMethod,

    // ========================================================================
    // Data handling
    // ========================================================================
    /// Skip typing (but still advance) for empty/missing values
    pub skip_empty_fields: bool,
    /// Truncate values longer than this many characters
    pub max_field_length: Option<usize>,
    /// Encoding label of the input file
    pub encoding: String,

    // ========================================================================
    // Safety
    // ========================================================================
    pub max_records_per_session: Option<usize>,
    /// Ask before starting
    pub confirmation_required: bool,

    // ========================================================================
    // Logging
    // ========================================================================
    pub log_level: LogLevel,
    /// Write logs to this file instead of stderr
    pub log_file: Option<String>,
}

impl Default for FillerConfig {
    fn default() -> Self {
        Self {
            pause_between_actions: 0.5,
            typing_interval: 0.05,
            field_transition_delay: 0.3,
            form_submission_delay: 2.0,
            record_delay: 1.0,
            page_load_delay: 3.0,
            wait_for_page_load: true,
            clear_fields: true,
            use_failsafe: true,
            navigation_method: NavigationMethod::default(),
            submission_method: SubmissionMethod::default(),
            skip_empty_fields: true,
            max_field_length: None,
            encoding: "utf-8".into(),
            max_records_per_session: None,
            confirmation_required: true,
            log_level: LogLevel::default(),
            log_file: None,
        }
    }
}

// ============================================================================
// Enumerated options
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationMethod {
    #[default]
    Tab,
    Enter,
    /// Needs field coordinates, which are never supplied
    Click,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMethod {
    #[default]
    Enter,
    /// Tab onto the submit button, then Enter
    TabEnter,
    /// Needs submit button coordinates, which are never supplied
    Click,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl NavigationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationMethod::Tab => "tab",
            NavigationMethod::Enter => "enter",
            NavigationMethod::Click => "click",
        }
    }
}

impl SubmissionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionMethod::Enter => "enter",
            SubmissionMethod::TabEnter => "tab_enter",
            SubmissionMethod::Click => "click",
        }
    }
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for NavigationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tab" => Ok(NavigationMethod::Tab),
            "enter" => Ok(NavigationMethod::Enter),
            "click" => Ok(NavigationMethod::Click),
            _ => Err("must be 'tab', 'enter', or 'click'".into()),
        }
    }
}

impl FromStr for SubmissionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enter" => Ok(SubmissionMethod::Enter),
            "tab_enter" => Ok(SubmissionMethod::TabEnter),
            "click" => Ok(SubmissionMethod::Click),
            _ => Err("must be 'enter', 'tab_enter', or 'click'".into()),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err("must be 'DEBUG', 'INFO', 'WARNING', or 'ERROR'".into()),
        }
    }
}

impl fmt::Display for NavigationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SubmissionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Presets
// ============================================================================

/// Named timing profiles for common targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Minimal delays
    Fast,
    /// Slow but reliable
    Slow,
    /// Web forms that reload after submission
    Web,
    /// Desktop applications, no page load wait
    Desktop,
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Preset::Fast),
            "slow" => Ok(Preset::Slow),
            "web" => Ok(Preset::Web),
            "desktop" => Ok(Preset::Desktop),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }
}

impl Preset {
    pub fn config(self) -> FillerConfig {
        let base = FillerConfig::default();
        match self {
            Preset::Fast => FillerConfig {
                pause_between_actions: 0.1,
                typing_interval: 0.01,
                field_transition_delay: 0.1,
                form_submission_delay: 1.0,
                record_delay: 0.5,
                page_load_delay: 1.5,
                ..base
            },
            Preset::Slow => FillerConfig {
                pause_between_actions: 1.0,
                typing_interval: 0.1,
                field_transition_delay: 0.5,
                form_submission_delay: 3.0,
                record_delay: 2.0,
                page_load_delay: 5.0,
                ..base
            },
            Preset::Web => FillerConfig {
                record_delay: 1.5,
                page_load_delay: 4.0,
                navigation_method: NavigationMethod::Tab,
                submission_method: SubmissionMethod::Enter,
                wait_for_page_load: true,
                ..base
            },
            Preset::Desktop => FillerConfig {
                pause_between_actions: 0.3,
                typing_interval: 0.03,
                field_transition_delay: 0.2,
                form_submission_delay: 1.0,
                record_delay: 0.5,
                page_load_delay: 1.0,
                navigation_method: NavigationMethod::Tab,
                submission_method: SubmissionMethod::Enter,
                wait_for_page_load: false,
                ..base
            },
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl FillerConfig {
    /// Defaults with `FF_*` environment overrides applied, validated
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Build the effective configuration: preset (or defaults), then the
    /// config file, then `FF_*` environment variables.
    ///
    /// An explicit `path` must exist; otherwise `formfill.toml` is used when present.
    pub fn load(path: Option<&Path>, preset: Option<Preset>) -> Result<Self, ConfigError> {
        let mut config = preset.map(Preset::config).unwrap_or_default();

        let file = match path {
            Some(p) => Some(fs::read_to_string(p)?),
            None => {
                let p = Path::new(DEFAULT_CONFIG_FILE);
                if p.exists() {
                    Some(fs::read_to_string(p)?)
                } else {
                    None
                }
            }
        };
        if let Some(text) = file {
            config = config.merge_toml(&text)?;
        }

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay the keys present in a TOML document onto this configuration
    pub fn merge_toml(self, text: &str) -> Result<Self, ConfigError> {
        let overlay: toml::Table = toml::from_str(text)?;
        let mut table = match toml::Value::try_from(&self) {
            Ok(toml::Value::Table(table)) => table,
            Ok(_) => toml::Table::new(),
            Err(e) => {
                return Err(ConfigError::Invalid {
                    field: "config",
                    reason: e.to_string(),
                });
            }
        };
        for (key, value) in overlay {
            table.insert(key, value);
        }
        Ok(toml::Value::Table(table).try_into()?)
    }

    /// Apply overrides from a key/value source such as the process environment.
    ///
    /// Keys are `FF_` followed by the upper-cased field name. Unset keys leave
    /// the current value alone; an empty optional limit clears it.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            let key = format!("{ENV_PREFIX}{}", name.to_uppercase());
            lookup(&key).map(|value| (key, value))
        };

        for (name, slot) in [
            ("pause_between_actions", &mut self.pause_between_actions),
            ("typing_interval", &mut self.typing_interval),
            ("field_transition_delay", &mut self.field_transition_delay),
            ("form_submission_delay", &mut self.form_submission_delay),
            ("record_delay", &mut self.record_delay),
            ("page_load_delay", &mut self.page_load_delay),
        ] {
            if let Some((key, value)) = get(name) {
                *slot = parse_value(&key, &value)?;
            }
        }

        for (name, slot) in [
            ("wait_for_page_load", &mut self.wait_for_page_load),
            ("clear_fields", &mut self.clear_fields),
            ("use_failsafe", &mut self.use_failsafe),
            ("skip_empty_fields", &mut self.skip_empty_fields),
            ("confirmation_required", &mut self.confirmation_required),
        ] {
            if let Some((_, value)) = get(name) {
                *slot = value.trim().eq_ignore_ascii_case("true");
            }
        }

        for (name, slot) in [
            ("max_field_length", &mut self.max_field_length),
            ("max_records_per_session", &mut self.max_records_per_session),
        ] {
            if let Some((key, value)) = get(name) {
                *slot = if value.trim().is_empty() {
                    None
                } else {
                    Some(parse_value(&key, &value)?)
                };
            }
        }

        if let Some((key, value)) = get("navigation_method") {
            self.navigation_method = parse_value(&key, &value)?;
        }
        if let Some((key, value)) = get("submission_method") {
            self.submission_method = parse_value(&key, &value)?;
        }
        if let Some((key, value)) = get("log_level") {
            self.log_level = parse_value(&key, &value)?;
        }
        if let Some((_, value)) = get("encoding") {
            self.encoding = value;
        }
        if let Some((_, value)) = get("log_file") {
            self.log_file = Some(value).filter(|v| !v.is_empty());
        }

        Ok(())
    }

    /// Check every invariant, failing on the first violated field
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("pause_between_actions", self.pause_between_actions),
            ("typing_interval", self.typing_interval),
            ("field_transition_delay", self.field_transition_delay),
            ("form_submission_delay", self.form_submission_delay),
            ("record_delay", self.record_delay),
            ("page_load_delay", self.page_load_delay),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be non-negative, got {value}"),
                });
            }
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{value} seconds is too long"),
                });
            }
        }

        if self.max_field_length == Some(0) {
            return Err(ConfigError::Invalid {
                field: "max_field_length",
                reason: "must be positive or unset".into(),
            });
        }
        if self.max_records_per_session == Some(0) {
            return Err(ConfigError::Invalid {
                field: "max_records_per_session",
                reason: "must be positive or unset".into(),
            });
        }
        if encoding_rs::Encoding::for_label(self.encoding.as_bytes()).is_none() {
            return Err(ConfigError::Invalid {
                field: "encoding",
                reason: format!("unknown encoding '{}'", self.encoding),
            });
        }

        Ok(())
    }

    pub fn pause_between_actions(&self) -> Duration {
        secs(self.pause_between_actions)
    }

    pub fn typing_interval(&self) -> Duration {
        secs(self.typing_interval)
    }

    pub fn field_transition_delay(&self) -> Duration {
        secs(self.field_transition_delay)
    }

    pub fn form_submission_delay(&self) -> Duration {
        secs(self.form_submission_delay)
    }

    pub fn record_delay(&self) -> Duration {
        secs(self.record_delay)
    }

    pub fn page_load_delay(&self) -> Duration {
        secs(self.page_load_delay)
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Parse {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}
