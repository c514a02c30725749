//! Navigator configuration.
//!
//! Every knob has a default matching the host page the navigator was built
//! for; a TOML file may override any subset of them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::dom::selector::{Selector, SelectorError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid selector `{name}`: {source}")]
    Selector {
        name: &'static str,
        source: SelectorError,
    },
}

/// Markers of the host markup, as selector strings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SelectorConfig {
    pub turn: String,
    pub user_message: String,
    pub user_content: String,
    pub scroll_container: String,
    pub thread: String,
    /// Attribute on a turn naming its author role directly.
    pub turn_role_attr: String,
    /// Attribute carrying a durable per-turn identifier.
    pub durable_id_attr: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            turn: r#"article[data-testid^="conversation-turn-"]"#.into(),
            user_message: r#"[data-message-author-role="user"]"#.into(),
            user_content: ".whitespace-pre-wrap".into(),
            scroll_container: "[data-scroll-root]".into(),
            thread: "main".into(),
            turn_role_attr: "data-turn".into(),
            durable_id_attr: "data-testid".into(),
        }
    }
}

/// Selectors compiled once at startup.
#[derive(Debug, Clone)]
pub struct Selectors {
    pub turn: Selector,
    pub user_message: Selector,
    pub user_content: Selector,
    pub scroll_container: Selector,
    pub thread: Selector,
    pub turn_role_attr: String,
    pub durable_id_attr: String,
}

impl SelectorConfig {
    pub fn compile(&self) -> Result<Selectors, ConfigError> {
        let parse = |name: &'static str, src: &str| {
            Selector::parse(src).map_err(|source| ConfigError::Selector { name, source })
        };
        Ok(Selectors {
            turn: parse("turn", &self.turn)?,
            user_message: parse("user_message", &self.user_message)?,
            user_content: parse("user_content", &self.user_content)?,
            scroll_container: parse("scroll_container", &self.scroll_container)?,
            thread: parse("thread", &self.thread)?,
            turn_role_attr: self.turn_role_attr.clone(),
            durable_id_attr: self.durable_id_attr.clone(),
        })
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct NavigatorConfig {
    pub selectors: SelectorConfig,
    /// Character budget of the outline label.
    pub summary_max_len: usize,
    /// Character budget of the hover preview.
    pub preview_max_len: usize,
    /// Cap on user- or AI-assigned labels.
    pub rename_max_len: usize,
    /// Base debounce; the mutation observer uses twice this.
    pub debounce_ms: u64,
    pub throttle_ms: u64,
    pub tooltip_delay_ms: u64,
    pub mount_delay_ms: u64,
    pub frame_interval_ms: u64,
    pub scroll_duration_ms: u64,
    /// Distance from the viewport top below which an entry counts as read.
    pub activation_threshold: f32,
    pub scroll_lead_in: f32,
    pub summary_input_max_chars: usize,
    /// Base URL of the summarization proxy; summarization is disabled
    /// without it.
    pub api_base: Option<String>,
    pub http_timeout_secs: u64,
    /// Where labels and the collapsed flag persist; in-memory without it.
    pub store_path: Option<PathBuf>,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            selectors: SelectorConfig::default(),
            summary_max_len: 30,
            preview_max_len: 150,
            rename_max_len: 50,
            debounce_ms: 200,
            throttle_ms: 100,
            tooltip_delay_ms: 500,
            mount_delay_ms: 800,
            frame_interval_ms: 16,
            scroll_duration_ms: 500,
            activation_threshold: 150.0,
            scroll_lead_in: 20.0,
            summary_input_max_chars: 4000,
            api_base: None,
            http_timeout_secs: 30,
            store_path: None,
        }
    }
}

impl NavigatorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        // surface selector typos at load time rather than as an empty outline
        config.selectors.compile()?;
        Ok(config)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn mutation_debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms * 2)
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn tooltip_delay(&self) -> Duration {
        Duration::from_millis(self.tooltip_delay_ms)
    }

    pub fn mount_delay(&self) -> Duration {
        Duration::from_millis(self.mount_delay_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    pub fn scroll_duration(&self) -> Duration {
        Duration::from_millis(self.scroll_duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_compile() {
        let config = NavigatorConfig::default();
        assert!(config.selectors.compile().is_ok());
        assert_eq!(config.mutation_debounce(), Duration::from_millis(400));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = NavigatorConfig::from_toml(
            r#"
            summary_max_len = 40
            api_base = "http://localhost:3000"

            [selectors]
            user_content = ".markdown"
            "#,
        )
        .unwrap();
        assert_eq!(config.summary_max_len, 40);
        assert_eq!(config.preview_max_len, 150);
        assert_eq!(config.selectors.user_content, ".markdown");
        assert_eq!(config.selectors.thread, "main");
        assert_eq!(config.api_base.as_deref(), Some("http://localhost:3000"));
    }

    #[test]
    fn bad_selector_is_reported() {
        let err = NavigatorConfig::from_toml(
            r#"
            [selectors]
            turn = "main + article"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Selector { name: "turn", .. }));
    }
}
