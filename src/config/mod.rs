use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "Remarkdesk";
const APP_NAME: &str = "remarkdesk";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let default_cfg = AppConfig::default();
            self.store(&default_cfg)?;
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        Ok(cfg)
    }

    /// Persists the config, including the remembered last-opened file.
    pub fn store(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes()).context("writing config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub state_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var("REMARKDESK_CONFIG").ok().map(PathBuf::from);
        let override_data = env::var("REMARKDESK_DATA").ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let data_dir = override_data.unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
        let state_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_dir.join("state"));
        let log_dir = state_dir.join("logs");

        Ok(Self {
            config_dir,
            config_file,
            data_dir,
            state_dir,
            log_dir,
        })
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.config_dir,
            &self.data_dir,
            &self.state_dir,
            &self.log_dir,
        ] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Reopened on startup when no file is given on the command line.
    pub last_file: Option<PathBuf>,
    /// Default tag-combination mode: match any selected tag instead of all.
    pub match_any_tag: bool,
    /// Require explicit confirmation before a text save drops categories or
    /// tags.
    pub confirm_lossy_save: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            last_file: None,
            match_any_tag: false,
            confirm_lossy_save: true,
        }
    }
}

impl AppConfig {
    pub fn remember_file(&mut self, path: &Path) {
        self.last_file = Some(path.to_path_buf());
    }

    pub fn forget_file(&mut self) {
        self.last_file = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_require_lossy_confirmation() {
        let cfg = AppConfig::default();
        assert!(cfg.confirm_lossy_save);
        assert!(!cfg.match_any_tag);
        assert!(cfg.last_file.is_none());
    }

    #[test]
    fn config_round_trips_through_toml() -> Result<()> {
        let mut cfg = AppConfig::default();
        cfg.remember_file(Path::new("/tmp/remarks.json"));
        cfg.match_any_tag = true;

        let raw = toml::to_string_pretty(&cfg)?;
        let parsed: AppConfig = toml::from_str(&raw)?;
        assert_eq!(parsed.last_file, cfg.last_file);
        assert!(parsed.match_any_tag);
        assert!(parsed.confirm_lossy_save);
        Ok(())
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() -> Result<()> {
        let parsed: AppConfig = toml::from_str("match_any_tag = true\n")?;
        assert!(parsed.match_any_tag);
        assert!(parsed.confirm_lossy_save);
        assert!(parsed.last_file.is_none());
        Ok(())
    }
}
