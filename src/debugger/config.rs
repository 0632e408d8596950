//! Debugger configuration

use serde::Deserialize;

/// Settings fixed for the lifetime of a debugging session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Colorize prompts, listings and errors
    pub color: bool,
    /// Number of extra lines `list` shows after its starting line
    pub list_window: usize,
    /// Pause at the first stoppable node
    pub stop_on_entry: bool,
    pub prompt: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            color: true,
            list_window: 5,
            stop_on_entry: true,
            prompt: "(kestrel) ".to_string(),
        }
    }
}

impl DebugConfig {
    /// Plain output, suitable for transcripts and piped sessions
    pub fn plain() -> Self {
        Self {
            color: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: DebugConfig = serde_json::from_str(r#"{ "list_window": 3 }"#).unwrap();
        assert_eq!(config.list_window, 3);
        assert!(config.color);
        assert!(config.stop_on_entry);
        assert_eq!(config.prompt, "(kestrel) ");
    }

    #[test]
    fn plain_disables_color_only() {
        let config = DebugConfig::plain();
        assert!(!config.color);
        assert_eq!(config.list_window, DebugConfig::default().list_window);
    }
}
