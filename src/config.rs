use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub server: ServerConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  /// Backend origin, e.g. "https://admin.example.coffee". API paths are
  /// absolute, so only the scheme/host/port part is used.
  pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// How long a cached response is served without revalidation.
  #[serde(default = "default_stale_secs")]
  pub stale_secs: u64,
  /// How long unwatched entries survive before the sweeper evicts them.
  #[serde(default = "default_gc_secs")]
  pub gc_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_secs: default_stale_secs(),
      gc_secs: default_gc_secs(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
  /// Rows requested per list page.
  #[serde(default = "default_page_size")]
  pub page_size: u32,
  /// Stock level below which the dashboard counts a product as running low.
  #[serde(default = "default_low_stock_threshold")]
  pub low_stock_threshold: i64,
}

impl Default for UiConfig {
  fn default() -> Self {
    Self {
      page_size: default_page_size(),
      low_stock_threshold: default_low_stock_threshold(),
    }
  }
}

fn default_stale_secs() -> u64 {
  300
}

fn default_gc_secs() -> u64 {
  600
}

fn default_page_size() -> u32 {
  50
}

fn default_low_stock_threshold() -> i64 {
  10
}

impl Default for Config {
  fn default() -> Self {
    Self {
      server: ServerConfig {
        url: "http://localhost:8080".into(),
      },
      cache: CacheConfig::default(),
      ui: UiConfig::default(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./barista.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/barista/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/barista/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("barista.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("barista").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Session token from the environment, if one was exported.
  ///
  /// Checks BARISTA_TOKEN first, then BARISTA_API_TOKEN as fallback. When
  /// neither is set the app starts at the login screen instead.
  pub fn get_api_token() -> Option<String> {
    std::env::var("BARISTA_TOKEN")
      .or_else(|_| std::env::var("BARISTA_API_TOKEN"))
      .ok()
  }

  pub fn stale_after(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.cache.stale_secs as i64)
  }

  pub fn expire_after(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.cache.gc_secs as i64)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_gets_defaults() {
    let config: Config = serde_yaml::from_str("server:\n  url: http://localhost:9000\n").unwrap();
    assert_eq!(config.server.url, "http://localhost:9000");
    assert_eq!(config.cache.stale_secs, 300);
    assert_eq!(config.cache.gc_secs, 600);
    assert_eq!(config.ui.page_size, 50);
    assert_eq!(config.ui.low_stock_threshold, 10);
  }

  #[test]
  fn test_overrides_are_honored() {
    let yaml =
      "server:\n  url: http://localhost:9000\ncache:\n  stale_secs: 30\nui:\n  low_stock_threshold: 5\n";
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.cache.stale_secs, 30);
    assert_eq!(config.cache.gc_secs, 600);
    assert_eq!(config.ui.low_stock_threshold, 5);
  }
}
