//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::lab::Lab;

/// dlab configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default author for new records
    pub author: Option<String>,

    /// Roster username used for workflow role checks
    pub user: Option<String>,

    /// Editor command for `dlab <entity> edit`
    pub editor: Option<String>,

    /// Default output format
    pub default_format: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load(lab: Option<&Lab>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/dlab/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            config.merge_file(&global_path);
        }

        // 3. Lab config (.dlab/config.yaml)
        if let Some(lab) = lab {
            config.merge_file(&lab.dlab_dir().join("config.yaml"));
        }

        // 4. Environment variables
        if let Ok(author) = std::env::var("DLAB_AUTHOR") {
            config.author = Some(author);
        }
        if let Ok(user) = std::env::var("DLAB_USER") {
            config.user = Some(user);
        }
        if let Ok(editor) = std::env::var("DLAB_EDITOR") {
            config.editor = Some(editor);
        }

        config
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "dlab")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    fn merge_file(&mut self, path: &Path) {
        if !path.exists() {
            return;
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yml::from_str::<Config>(&contents) {
                Ok(other) => self.merge(other),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config file"),
            },
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "cannot read config file"),
        }
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.user.is_some() {
            self.user = other.user;
        }
        if other.editor.is_some() {
            self.editor = other.editor;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
    }

    fn login_name() -> Option<String> {
        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .ok()
            .filter(|s| !s.is_empty())
    }

    /// Author name for new records, falling back to the configured user or login name
    pub fn author(&self) -> String {
        self.author
            .clone()
            .or_else(|| self.user.clone())
            .or_else(Self::login_name)
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Roster username of whoever runs the command
    pub fn username(&self) -> String {
        self.user
            .clone()
            .or_else(Self::login_name)
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Get the editor command
    pub fn editor(&self) -> String {
        self.editor
            .clone()
            .or_else(|| std::env::var("EDITOR").ok())
            .or_else(|| std::env::var("VISUAL").ok())
            .unwrap_or_else(|| "vi".to_string())
    }

    /// Run the editor on a file, properly handling commands with arguments
    /// (e.g., "emacsclient -nw" or "code --wait")
    pub fn run_editor(&self, file_path: &Path) -> std::io::Result<std::process::ExitStatus> {
        let editor = self.editor();
        let parts: Vec<&str> = editor.split_whitespace().collect();

        let Some((cmd, args)) = parts.split_first() else {
            return std::process::Command::new("vi").arg(file_path).status();
        };

        std::process::Command::new(cmd)
            .args(args)
            .arg(file_path)
            .status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_later_layer() {
        let mut base = Config {
            author: Some("Ana".to_string()),
            user: Some("ana".to_string()),
            editor: None,
            default_format: Some("yaml".to_string()),
        };
        base.merge(Config {
            author: None,
            user: Some("ivan".to_string()),
            editor: Some("nano".to_string()),
            default_format: None,
        });
        assert_eq!(base.author.as_deref(), Some("Ana"));
        assert_eq!(base.user.as_deref(), Some("ivan"));
        assert_eq!(base.editor.as_deref(), Some("nano"));
        assert_eq!(base.default_format.as_deref(), Some("yaml"));
    }

    #[test]
    fn test_author_falls_back_to_user() {
        let config = Config {
            user: Some("ivan".to_string()),
            ..Default::default()
        };
        assert_eq!(config.author(), "ivan");
        assert_eq!(config.username(), "ivan");
    }

    #[test]
    fn test_lab_config_file_is_read() {
        let tmp = tempfile::tempdir().unwrap();
        let lab = Lab::init(tmp.path()).unwrap();
        std::fs::write(
            lab.dlab_dir().join("config.yaml"),
            "author: Lab Author\ndefault_format: json\n",
        )
        .unwrap();
        let mut config = Config::default();
        config.merge_file(&lab.dlab_dir().join("config.yaml"));
        assert_eq!(config.author.as_deref(), Some("Lab Author"));
        assert_eq!(config.default_format.as_deref(), Some("json"));
    }
}
