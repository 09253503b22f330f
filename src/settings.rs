//! # settings.rs
//!
//! Tool-level settings that are not specific to one report: which renderer
//! executable to call, where packaged templates live, and the fixed render
//! flags. Sources are layered with the `config` crate, lowest priority first:
//! - built-in defaults
//! - `diffex.toml` in the working directory (optional)
//! - the file passed with `--config` (required when given, always TOML)
//! - `DIFFEX_*` environment variables, e.g. `DIFFEX_RENDERER=/opt/quarto/bin/quarto`
//!
//! `--renderer` on the command line is applied last by the caller.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::{DiffexError, DiffexResult};

pub const LOCAL_SETTINGS_FILE: &str = "diffex.toml";
pub const ENV_PREFIX: &str = "DIFFEX";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// Renderer executable, looked up on PATH when not a path.
    #[serde(default = "default_renderer")]
    pub renderer: String,
    /// Directory holding `deg_report.qmd` / `gsea_report.qmd`.
    #[serde(default)]
    pub template_dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub self_contained: bool,
    #[serde(default = "default_true")]
    pub no_cache: bool,
    /// Appended verbatim to every render invocation.
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_renderer() -> String {
    "quarto".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            renderer: default_renderer(),
            template_dir: None,
            self_contained: true,
            no_cache: true,
            extra_args: Vec::new(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings from the working directory, an optional explicit file and
    /// the process environment.
    pub fn load(config_file: Option<&Path>) -> DiffexResult<Settings> {
        Settings::load_with_env(config_file, None)
    }

    /// Same as [`Settings::load`], but reads `DIFFEX_*` variables from `env`
    /// instead of the process environment when it is `Some`.
    pub fn load_with_env(
        config_file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> DiffexResult<Settings> {
        let mut builder = Config::builder()
            .add_source(File::new(LOCAL_SETTINGS_FILE, FileFormat::Toml).required(false));

        if let Some(path) = config_file {
            if !path.exists() {
                return Err(DiffexError::InputNotFound {
                    path: path.to_path_buf(),
                });
            }
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(" ")
                .with_list_parse_key("extra_args")
                .source(env),
        );

        let settings = builder.build()?.try_deserialize::<Settings>()?;
        #[cfg(debug_assertions)]
        tracing::trace!(?settings, "settings resolved");
        Ok(settings)
    }

    /// Apply the `--renderer` flag on top of the layered sources.
    pub fn with_renderer(mut self, renderer: Option<&str>) -> Settings {
        if let Some(renderer) = renderer {
            self.renderer = renderer.to_string();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_sources() {
        let settings = Settings::load_with_env(None, Some(HashMap::new())).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.renderer, "quarto");
        assert!(settings.self_contained);
    }

    #[test]
    fn test_config_file_and_env_layering() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            "renderer = \"/opt/quarto/bin/quarto\"\nself_contained = false\ntemplate_dir = \"/srv/templates\"\n",
        )
        .unwrap();

        let from_file = Settings::load_with_env(Some(&path), Some(HashMap::new())).unwrap();
        assert_eq!(from_file.renderer, "/opt/quarto/bin/quarto");
        assert!(!from_file.self_contained);
        assert!(from_file.no_cache);
        assert_eq!(from_file.template_dir, Some(PathBuf::from("/srv/templates")));

        let mut env = HashMap::new();
        env.insert("DIFFEX_RENDERER".to_string(), "quarto-dev".to_string());
        env.insert("DIFFEX_EXTRA_ARGS".to_string(), "--log-level warning".to_string());
        let layered = Settings::load_with_env(Some(&path), Some(env)).unwrap();
        assert_eq!(layered.renderer, "quarto-dev");
        assert_eq!(layered.extra_args, vec!["--log-level", "warning"]);
        assert!(!layered.self_contained);
    }

    #[test]
    fn test_config_file_extension_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("diffex.cfg");
        fs::write(&path, "renderer = \"quarto-1.5\"\nno_cache = false\n").unwrap();

        let settings = Settings::load_with_env(Some(&path), Some(HashMap::new())).unwrap();
        assert_eq!(settings.renderer, "quarto-1.5");
        assert!(!settings.no_cache);
    }

    #[test]
    fn test_missing_config_file() {
        let result = Settings::load_with_env(Some(Path::new("no/such/diffex.toml")), Some(HashMap::new()));
        assert!(matches!(result, Err(DiffexError::InputNotFound { .. })));
    }

    #[test]
    fn test_with_renderer() {
        let settings = Settings::default().with_renderer(Some("/usr/local/bin/quarto"));
        assert_eq!(settings.renderer, "/usr/local/bin/quarto");
        let unchanged = Settings::default().with_renderer(None);
        assert_eq!(unchanged.renderer, "quarto");
    }
}
