use std::path::{Path, PathBuf};

use assistant_runtime::{DEFAULT_OPENAI_MODEL, OPENAI_PROVIDER_ID, RuntimeConfig};
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use gpui::App;
use gpui_component::{Theme, ThemeMode};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

pub const DEFAULT_TITLE: &str = "Assistant";
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
pub const SETTINGS_DIRECTORY_NAME: &str = "assistant-shell";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const ENV_PREFIX: &str = "ASSISTANT_SHELL_";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    #[default]
    Light,
    Dark,
}

impl Appearance {
    pub fn theme_mode(self) -> ThemeMode {
        match self {
            Self::Light => ThemeMode::Light,
            Self::Dark => ThemeMode::Dark,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellSettings {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_provider_id")]
    pub provider_id: String,
    #[serde(default)]
    pub api_key: String,
    /// Provider base URL. `None` until a settings source names one, so `OPENAI_BASE_URL`
    /// only fills it when nothing explicit was configured.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub appearance: Appearance,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            title: default_title(),
            provider_id: default_provider_id(),
            api_key: String::new(),
            endpoint: None,
            model: None,
            appearance: Appearance::default(),
        }
    }
}

impl ShellSettings {
    pub fn normalized(mut self) -> Self {
        self.title = non_blank_or(self.title, default_title);
        self.provider_id = non_blank_or(self.provider_id, default_provider_id);
        self.api_key = self.api_key.trim().to_string();
        self.endpoint = non_blank(self.endpoint);
        self.model = non_blank(self.model);
        self
    }

    /// Fills blank provider fields from the conventional `OPENAI_*` variables.
    pub fn with_openai_fallback(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| non_blank(lookup(key));

        if self.api_key.trim().is_empty()
            && let Some(api_key) = lookup("OPENAI_API_KEY")
        {
            self.api_key = api_key;
        }
        if self.model.is_none() {
            self.model = lookup("OPENAI_MODEL");
        }
        if self.endpoint.is_none() {
            self.endpoint = lookup("OPENAI_BASE_URL");
        }
        self
    }

    /// Base URL the runtime talks to.
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig::new(
            &self.provider_id,
            &self.api_key,
            self.endpoint(),
            self.model.clone(),
        )
    }

    pub fn model_label(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL)
    }

    pub fn apply_theme(&self, cx: &mut App) {
        Theme::change(self.appearance.theme_mode(), None, cx);
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to read settings from {path:?} on `{stage}`: {source}"))]
    Extract {
        stage: &'static str,
        path: PathBuf,
        #[snafu(source(from(figment::Error, Box::new)))]
        source: Box<figment::Error>,
    },
}

pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
        .unwrap_or_else(|| PathBuf::from(".assistant-shell"))
        .join(SETTINGS_FILE_NAME)
}

/// Defaults, then the JSON file at `path` when it exists, then `ASSISTANT_SHELL_*`.
pub fn settings_figment(path: &Path) -> Figment {
    Figment::from(Serialized::defaults(ShellSettings::default()))
        .merge(Json::file(path))
        .merge(Env::prefixed(ENV_PREFIX))
}

pub fn load_settings(path: &Path) -> Result<ShellSettings, SettingsError> {
    let settings = settings_figment(path)
        .extract::<ShellSettings>()
        .context(ExtractSnafu {
            stage: "extract-settings",
            path: path.to_path_buf(),
        })?;

    Ok(settings
        .normalized()
        .with_openai_fallback(|key| std::env::var(key).ok()))
}

/// Loads settings, falling back to defaults when the sources cannot be parsed.
pub fn load_or_default(path: &Path) -> ShellSettings {
    match load_settings(path) {
        Ok(settings) => {
            tracing::info!(
                path = ?path,
                provider_id = %settings.provider_id,
                model = %settings.model_label(),
                "loaded settings"
            );
            settings
        }
        Err(error) => {
            tracing::warn!(error = %error, "failed to load settings, using defaults");
            ShellSettings::default().with_openai_fallback(|key| std::env::var(key).ok())
        }
    }
}

fn non_blank_or(value: String, default: fn() -> String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default()
    } else {
        trimmed.to_string()
    }
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_provider_id() -> String {
    OPENAI_PROVIDER_ID.to_string()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use figment::Jail;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn normalization_restores_defaults_for_blank_fields() {
        let settings = ShellSettings {
            title: "   ".into(),
            provider_id: String::new(),
            api_key: "  sk-test ".into(),
            endpoint: Some(" ".into()),
            model: Some(" ".into()),
            appearance: Appearance::Dark,
        }
        .normalized();

        assert_eq!(settings.title, DEFAULT_TITLE);
        assert_eq!(settings.provider_id, OPENAI_PROVIDER_ID);
        assert_eq!(settings.api_key, "sk-test");
        assert_eq!(settings.endpoint, None);
        assert_eq!(settings.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(settings.model, None);
        assert_eq!(settings.appearance, Appearance::Dark);
    }

    #[test]
    fn openai_variables_fill_only_blank_fields() {
        let lookup = env(&[
            ("OPENAI_API_KEY", "env-key"),
            ("OPENAI_MODEL", "gpt-4.1"),
            ("OPENAI_BASE_URL", "https://proxy.test/v1"),
        ]);

        let filled = ShellSettings::default().with_openai_fallback(&lookup);
        assert_eq!(filled.api_key, "env-key");
        assert_eq!(filled.model.as_deref(), Some("gpt-4.1"));
        assert_eq!(filled.endpoint(), "https://proxy.test/v1");

        let explicit = ShellSettings {
            api_key: "file-key".into(),
            model: Some("o3".into()),
            endpoint: Some("https://custom.test/v1".into()),
            ..ShellSettings::default()
        }
        .with_openai_fallback(&lookup);
        assert_eq!(explicit.api_key, "file-key");
        assert_eq!(explicit.model.as_deref(), Some("o3"));
        assert_eq!(explicit.endpoint(), "https://custom.test/v1");
    }

    #[test]
    fn explicit_default_endpoint_is_not_overridden() {
        Jail::expect_with(|jail| {
            jail.create_file(
                SETTINGS_FILE_NAME,
                r#"{ "endpoint": "https://api.openai.com/v1" }"#,
            )?;

            let settings = settings_figment(Path::new(SETTINGS_FILE_NAME))
                .extract::<ShellSettings>()?
                .normalized()
                .with_openai_fallback(env(&[("OPENAI_BASE_URL", "https://proxy.test/v1")]));

            assert_eq!(settings.endpoint(), DEFAULT_ENDPOINT);
            assert_eq!(settings.runtime_config().base_url, DEFAULT_ENDPOINT);
            Ok(())
        });
    }

    #[test]
    fn blank_environment_values_are_ignored() {
        let settings =
            ShellSettings::default().with_openai_fallback(env(&[("OPENAI_API_KEY", "   ")]));

        assert!(settings.api_key.is_empty());
    }

    #[test]
    fn runtime_config_carries_provider_fields() {
        let settings = ShellSettings {
            api_key: "sk-test".into(),
            model: Some("gpt-4o".into()),
            ..ShellSettings::default()
        };
        let config = settings.runtime_config();

        assert_eq!(config.provider_id, OPENAI_PROVIDER_ID);
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.base_url, DEFAULT_ENDPOINT);
        assert_eq!(config.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn file_and_prefixed_environment_are_layered() {
        Jail::expect_with(|jail| {
            jail.create_file(
                SETTINGS_FILE_NAME,
                r#"{ "title": " Starter Template ", "api_key": "file-key", "appearance": "dark" }"#,
            )?;
            jail.set_env("ASSISTANT_SHELL_API_KEY", "env-key");

            let settings = settings_figment(Path::new(SETTINGS_FILE_NAME))
                .extract::<ShellSettings>()?
                .normalized();

            assert_eq!(settings.title, "Starter Template");
            assert_eq!(settings.api_key, "env-key");
            assert_eq!(settings.appearance, Appearance::Dark);
            assert_eq!(settings.endpoint(), DEFAULT_ENDPOINT);
            Ok(())
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_jail| {
            let settings = settings_figment(Path::new("does-not-exist.json"))
                .extract::<ShellSettings>()?;

            assert_eq!(settings, ShellSettings::default());
            Ok(())
        });
    }

    #[test]
    fn malformed_file_surfaces_an_extract_error() {
        Jail::expect_with(|jail| {
            jail.create_file(SETTINGS_FILE_NAME, r#"{ "appearance": "sepia" }"#)?;

            let error = load_settings(Path::new(SETTINGS_FILE_NAME))
                .expect_err("unknown appearance must not parse");
            assert!(matches!(error, SettingsError::Extract { stage: "extract-settings", .. }));
            Ok(())
        });
    }
}
