//! Settings for queryloom.
//!
//! [`Settings`] holds everything that influences compilation and logging, and
//! [`LazySettings`] provides a process-wide instance that is configured once
//! at startup.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// The complete set of queryloom settings.
///
/// # Examples
///
/// ```
/// use queryloom_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert_eq!(settings.dialect, "sqlite");
/// assert_eq!(settings.column_alias_separator, "_");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Whether debug mode is enabled (human-readable logs).
    pub debug: bool,
    /// The tracing filter directive, e.g. `"info"` or `"queryloom_db=trace"`.
    pub log_level: String,
    /// The SQL dialect name: `sqlite`, `postgresql` or `mysql`.
    pub dialect: String,
    /// Separator between a table alias and a column name in projected column
    /// labels, used by entity definitions that do not set their own.
    pub column_alias_separator: String,
    /// When set, a placeholder/parameter count mismatch fails compilation
    /// instead of being logged.
    pub strict_parameter_check: bool,
    /// Free-form settings for embedding applications.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            dialect: "sqlite".to_string(),
            column_alias_separator: "_".to_string(),
            strict_parameter_check: false,
            extra: HashMap::new(),
        }
    }
}

/// A lazily-configured settings holder.
///
/// # Panics
///
/// [`get`](LazySettings::get) panics if settings have not been configured.
/// [`configure`](LazySettings::configure) panics if called more than once.
pub struct LazySettings {
    inner: OnceLock<Settings>,
}

impl Default for LazySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl LazySettings {
    /// Creates a new, unconfigured `LazySettings`.
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Configures the global settings. Must be called exactly once.
    ///
    /// # Panics
    ///
    /// Panics if settings have already been configured.
    pub fn configure(&self, settings: Settings) {
        self.inner
            .set(settings)
            .expect("Settings have already been configured");
    }

    /// Returns a reference to the configured settings.
    ///
    /// # Panics
    ///
    /// Panics if settings have not been configured.
    pub fn get(&self) -> &Settings {
        self.inner
            .get()
            .expect("Settings have not been configured. Call SETTINGS.configure() first.")
    }

    /// Returns the configured settings, if any.
    pub fn try_get(&self) -> Option<&Settings> {
        self.inner.get()
    }

    /// Returns `true` if settings have been configured.
    pub fn is_configured(&self) -> bool {
        self.inner.get().is_some()
    }
}

/// The global settings instance.
pub static SETTINGS: LazySettings = LazySettings::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let s = Settings::default();
        assert!(s.debug);
        assert_eq!(s.log_level, "info");
        assert_eq!(s.dialect, "sqlite");
        assert_eq!(s.column_alias_separator, "_");
        assert!(!s.strict_parameter_check);
        assert!(s.extra.is_empty());
    }

    #[test]
    fn test_lazy_settings_configure_and_get() {
        let lazy = LazySettings::new();
        assert!(!lazy.is_configured());
        assert!(lazy.try_get().is_none());

        let mut settings = Settings::default();
        settings.dialect = "postgresql".to_string();
        settings.strict_parameter_check = true;

        lazy.configure(settings);
        assert!(lazy.is_configured());
        assert_eq!(lazy.get().dialect, "postgresql");
        assert!(lazy.get().strict_parameter_check);
    }

    #[test]
    #[should_panic(expected = "already been configured")]
    fn test_lazy_settings_double_configure_panics() {
        let lazy = LazySettings::new();
        lazy.configure(Settings::default());
        lazy.configure(Settings::default());
    }

    #[test]
    #[should_panic(expected = "not been configured")]
    fn test_lazy_settings_get_before_configure_panics() {
        let lazy = LazySettings::new();
        let _ = lazy.get();
    }
}
