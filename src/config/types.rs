use serde::Deserialize;

/// Default seed URL
pub const DEFAULT_SEED_URL: &str = "https://www.bbc.co.uk/news/articles/cvg885p923jo";

/// Desktop browser user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Main configuration structure for Sumi-Harvest
///
/// Every table is optional; missing values fall back to the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub http: HttpConfig,
    pub output: OutputConfig,
}

/// Crawl scope and extraction configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Entry point of the crawl
    pub seed_url: String,

    /// Host patterns that may be fetched (e.g., "example.com" or "*.example.com").
    /// An empty list allows every host.
    pub allowed_domains: Vec<String>,

    /// Number of link levels to fetch, counting the seed as level 1. 0 is unlimited.
    pub max_depth: u32,

    /// Visit count at which an advisory signal is logged. 0 disables it.
    pub visit_watermark: u64,

    /// Whether `a[href]` links are enqueued when the depth bound permits
    pub follow_links: bool,

    /// CSS selectors whose element text is harvested; the selector is the fragment key
    pub selectors: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            seed_url: DEFAULT_SEED_URL.to_string(),
            allowed_domains: vec!["www.bbc.co.uk".to_string(), "bbc.co.uk".to_string()],
            max_depth: 1,
            visit_watermark: 100,
            follow_links: true,
            selectors: vec!["p".to_string()],
        }
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpConfig {
    /// User-Agent header value
    pub user_agent: String,

    /// Whole-request timeout in seconds
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the row-oriented CSV file
    pub csv_path: String,

    /// Path to the JSON Lines file
    pub jsonl_path: String,

    /// Write a `key,value` header row when the sink is opened
    pub csv_header: bool,

    /// fsync the CSV file after every record
    pub sync_each_record: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: "scrape.csv".to_string(),
            jsonl_path: "scrape.jsonl".to_string(),
            csv_header: false,
            sync_each_record: false,
        }
    }
}
