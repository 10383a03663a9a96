use crate::config::types::{Config, CrawlMode, RendererEngine, StorageMode};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Loads and parses a configuration file from the given path
///
/// Missing sections and keys take their defaults, so an empty file yields
/// the built-in target.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use scopecrawl::config::load_config;
///
/// let config = load_config(Path::new("scopecrawl.toml")).unwrap();
/// println!("Max depth: {}", config.crawler.max_depth);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so a set of persisted pages can be traced back to the
/// configuration that produced it.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Command-line values layered over the file (or default) configuration
///
/// `None` and empty lists leave the underlying value untouched.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_directory: Option<PathBuf>,
    pub depth_limit: Option<u32>,
    pub crawl_mode: Option<CrawlMode>,
    pub storage_mode: Option<StorageMode>,
    pub seeds: Vec<String>,
    pub patterns: Vec<String>,
    pub concurrency: Option<u32>,
    pub renderer: Option<RendererEngine>,
    pub no_screenshots: bool,
}

impl ConfigOverrides {
    /// Applies the overrides and re-validates the result
    pub fn apply(self, mut config: Config) -> Result<Config, ConfigError> {
        if let Some(dir) = self.output_directory {
            config.output.directory = dir;
        }
        if let Some(depth) = self.depth_limit {
            config.crawler.max_depth = depth;
        }
        if let Some(mode) = self.crawl_mode {
            config.crawler.mode = mode;
        }
        if let Some(mode) = self.storage_mode {
            config.output.storage_mode = mode;
        }
        if !self.seeds.is_empty() {
            match config.crawler.mode {
                CrawlMode::Page => config.crawler.seeds = self.seeds,
                CrawlMode::Asset => config.assets.seeds = self.seeds,
            }
        }
        if !self.patterns.is_empty() {
            config.scope.patterns = self.patterns;
        }
        if let Some(concurrency) = self.concurrency {
            config.crawler.concurrency = concurrency;
        }
        if let Some(engine) = self.renderer {
            config.renderer.engine = engine;
        }
        if self.no_screenshots {
            config.renderer.screenshots = false;
        }

        validate(&config)?;
        Ok(config)
    }
}

/// Creates the output directory if needed
///
/// An uncreatable output directory is a configuration error: the run must
/// abort before anything is fetched.
pub fn prepare_output_directory(config: &Config) -> Result<(), ConfigError> {
    let dir = &config.output.directory;
    std::fs::create_dir_all(dir).map_err(|source| ConfigError::OutputDirectory {
        path: dir.display().to_string(),
        source,
    })?;

    if !dir.is_dir() {
        return Err(ConfigError::OutputDirectory {
            path: dir.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "not a directory"),
        });
    }

    Ok(())
}
