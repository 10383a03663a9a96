use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Seed page of the built-in target: the IRPF 2022 practical manual
const DEFAULT_PAGE_SEED: &str = "https://sede.agenciatributaria.gob.es/Sede/ayuda/manuales-videos-folletos/manuales-practicos/irpf-2022/numero-identificacion-publicacion.html";

/// Path pattern confining the built-in target to the manual
const DEFAULT_SCOPE_PATTERN: &str = r"/Sede/ayuda/manuales-videos-folletos/manuales-practicos/irpf-2022/";

/// The seed redirects to `sede.`, so the harvest must admit subdomains
const DEFAULT_ASSET_DOMAIN: &str = "*.agenciatributaria.gob.es";
const DEFAULT_ASSET_SEED: &str = "https://agenciatributaria.gob.es/";

/// The manual's table of contents lives in this modal
const DEFAULT_WAIT_SELECTOR: &str = "div#indice-modal nav";

/// The table of contents is complete once no entry still points at `#`
const DEFAULT_READY_CONDITION: &str = "() => Array.from(document.querySelectorAll('div#indice-modal nav a')).filter(el => el.getAttribute('href') === '#').length === 0";

const DEFAULT_ASSET_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "odp", "rtf", "csv", "zip",
    "epub",
];

/// Main configuration structure
///
/// Built once at startup (TOML file, then CLI overrides) and shared
/// read-only by every component for the lifetime of the run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub scope: ScopeConfig,
    pub assets: AssetConfig,
    pub renderer: RendererConfig,
    pub output: OutputConfig,
}

/// Which artifact a crawl run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CrawlMode {
    /// Persist every in-scope page
    #[default]
    Page,
    /// Queue linked binary documents for download
    Asset,
}

impl fmt::Display for CrawlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page => write!(f, "page"),
            Self::Asset => write!(f, "asset"),
        }
    }
}

/// How persisted pages are named on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// One directory, files named by a hash of the normalized URL
    #[default]
    Flat,
    /// Mirror the URL path under the output root
    Hierarchical,
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => write!(f, "flat"),
            Self::Hierarchical => write!(f, "hierarchical"),
        }
    }
}

/// Which renderer fetches pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RendererEngine {
    /// Headless Chromium; executes page scripts before capture
    #[default]
    Browser,
    /// Plain HTTP GET
    Http,
}

impl fmt::Display for RendererEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Browser => write!(f, "browser"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    pub mode: CrawlMode,

    /// Maximum link-following depth from the seeds; 0 means unlimited
    pub max_depth: u32,

    /// Number of concurrent fetch workers
    pub concurrency: u32,

    /// Seed URLs for page crawling
    pub seeds: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            mode: CrawlMode::Page,
            max_depth: 0,
            concurrency: 4,
            seeds: vec![DEFAULT_PAGE_SEED.to_string()],
        }
    }
}

/// Crawlable space for page crawling
///
/// The built-in pattern only applies when the `[scope]` table is absent;
/// a table that lists only `domains` gets no patterns.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScopeConfig {
    /// Regular expressions searched against the full normalized URL
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Host allow-list (e.g., "example.com" or "*.example.com")
    #[serde(default)]
    pub domains: Vec<String>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            patterns: vec![DEFAULT_SCOPE_PATTERN.to_string()],
            domains: Vec::new(),
        }
    }
}

/// Asset harvest configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AssetConfig {
    /// Domain the harvest is confined to (wildcards allowed)
    pub domain: String,

    /// Seed URLs for the harvest
    pub seeds: Vec<String>,

    /// File extensions treated as binary assets
    pub extensions: Vec<String>,

    /// Job manifest file name, relative to the output directory
    pub queue_file: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            domain: DEFAULT_ASSET_DOMAIN.to_string(),
            seeds: vec![DEFAULT_ASSET_SEED.to_string()],
            extensions: DEFAULT_ASSET_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            queue_file: "assets.jsonl".to_string(),
        }
    }
}

/// Renderer configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RendererConfig {
    pub engine: RendererEngine,

    /// Upper bound for one fetch attempt, in seconds
    pub timeout_secs: u64,

    /// CSS selector that must appear before the page is captured
    pub wait_for_selector: Option<String>,

    /// JavaScript function expression that must return true before capture
    pub ready_condition: Option<String>,

    /// Capture a full-page PNG next to the persisted pages
    pub screenshots: bool,

    /// Total attempts for transient failures (first try included)
    pub max_attempts: u32,

    /// Base delay of the exponential backoff, in milliseconds
    pub backoff_ms: u64,

    /// User agents rotated per request; empty means the built-in pool
    pub user_agents: Vec<String>,

    /// Chromium binary; falls back to `BROWSER_EXECUTABLE_PATH`
    pub browser_executable: Option<PathBuf>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            engine: RendererEngine::Browser,
            timeout_secs: 30,
            wait_for_selector: Some(DEFAULT_WAIT_SELECTOR.to_string()),
            ready_condition: Some(DEFAULT_READY_CONDITION.to_string()),
            screenshots: true,
            max_attempts: 3,
            backoff_ms: 500,
            user_agents: Vec::new(),
            browser_executable: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Root directory for persisted artifacts
    pub directory: PathBuf,

    pub storage_mode: StorageMode,

    /// Extension of persisted page files, without the dot
    pub extension: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./data/html"),
            storage_mode: StorageMode::Flat,
            extension: "html".to_string(),
        }
    }
}

impl Config {
    /// Seeds for the active crawl mode
    pub fn active_seeds(&self) -> &[String] {
        match self.crawler.mode {
            CrawlMode::Page => &self.crawler.seeds,
            CrawlMode::Asset => &self.assets.seeds,
        }
    }

    /// Depth budget for the active crawl mode
    ///
    /// Asset harvesting is bounded by domain membership only.
    pub fn active_depth_limit(&self) -> u32 {
        match self.crawler.mode {
            CrawlMode::Page => self.crawler.max_depth,
            CrawlMode::Asset => 0,
        }
    }
}
