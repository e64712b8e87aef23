use crate::domain::SearchTarget;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_BUYER_REQUIREMENTS: &str =
    "Looking for a reliable device with good performance for everyday tasks";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub search: SearchConfig,

    pub marketplace: MarketplaceConfig,

    pub evaluator: EvaluatorConfig,

    pub report: ReportConfig,

    pub notifications: NotificationConfig,

    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/toribot.db".to_string(),
            log_level: "info".to_string(),
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub query: Option<String>,

    /// Marketplace product category id, e.g. "3215" for laptops.
    pub category: Option<String>,

    pub location: Option<String>,

    /// How many of the newest search results are ingested per run.
    pub max_listings: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            query: None,
            category: None,
            location: None,
            max_listings: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    pub base_url: String,

    pub user_agent: String,

    /// Request timeout in seconds (default: 30)
    pub request_timeout_seconds: u64,

    /// Lower bound of the random pause between detail page fetches.
    pub min_delay_ms: u64,

    pub max_delay_ms: u64,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.tori.fi".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            request_timeout_seconds: 30,
            min_delay_ms: 1000,
            max_delay_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    pub api_key: Option<String>,

    pub base_url: String,

    pub model: String,

    pub temperature: f32,

    pub max_tokens: u32,

    pub buyer_requirements: String,

    /// How many of the newest stored listings are considered per evaluation run.
    pub max_listings: usize,

    /// Free-text market context inserted into the prompt.
    pub market_analysis: Option<String>,

    /// Reject replies whose scores fall outside 0-10.
    pub enforce_score_bounds: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4-turbo-preview".to_string(),
            temperature: 0.7,
            max_tokens: 500,
            buyer_requirements: DEFAULT_BUYER_REQUIREMENTS.to_string(),
            max_listings: 3,
            market_analysis: None,
            enforce_score_bounds: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Where the HTML report is written. A leading `~` is expanded.
    pub output_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,

    pub bot_token: Option<String>,

    pub chat_id: Option<String>,

    /// Both scores must reach this value for an alert to be sent.
    pub min_score: f64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: None,
            chat_id: None,
            min_score: 8.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub check_interval_minutes: u32,

    pub cron_expression: Option<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval_minutes: 60,
            cron_expression: None,
        }
    }
}

/// Search settings given on the command line; they win over file and env.
#[derive(Debug, Clone, Default)]
pub struct SearchOverrides {
    pub query: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub max_listings: Option<usize>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_count(name: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse()
        .with_context(|| format!("{name} must be a non-negative integer, got '{raw}'"))
}

impl Config {
    /// Loads the file at `path`, or the first config file found in the
    /// default locations, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                info!("Loading config from: {}", path.display());
                Self::load_from_path(path)?
            }
            None => Self::load_default_locations()?,
        };

        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    fn load_default_locations() -> Result<Self> {
        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("toribot").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".toribot").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    /// Applies the environment variables the bot has always honoured.
    /// Blank values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| non_blank(lookup(name));

        if let Some(db) = var("TORIBOT_DATABASE") {
            self.general.database_path = db;
        }
        if let Some(query) = var("TORI_SEARCH_QUERY") {
            self.search.query = Some(query);
        }
        if let Some(category) = var("TORI_PRODUCT_CATEGORY") {
            self.search.category = Some(category);
        }
        if let Some(location) = var("TORI_LOCATION") {
            self.search.location = Some(location);
        }
        if let Some(raw) = var("MAX_LISTINGS") {
            let max = parse_count("MAX_LISTINGS", &raw)?;
            self.search.max_listings = max;
            self.evaluator.max_listings = max;
        }
        if let Some(key) = var("OPENAI_API_KEY") {
            self.evaluator.api_key = Some(key);
        }
        if let Some(requirements) = var("BUYER_REQUIREMENTS") {
            self.evaluator.buyer_requirements = requirements;
        }
        if let Some(path) = var("HTML_OUTPUT_PATH") {
            self.report.output_path = Some(path);
        }
        if let Some(token) = var("TELEGRAM_BOT_TOKEN") {
            self.notifications.bot_token = Some(token);
        }
        if let Some(chat) = var("TELEGRAM_CHAT_ID") {
            self.notifications.chat_id = Some(chat);
        }

        Ok(())
    }

    pub fn apply_search_overrides(&mut self, overrides: SearchOverrides) {
        if let Some(query) = non_blank(overrides.query) {
            self.search.query = Some(query);
        }
        if let Some(category) = non_blank(overrides.category) {
            self.search.category = Some(category);
        }
        if let Some(location) = non_blank(overrides.location) {
            self.search.location = Some(location);
        }
        if let Some(max) = overrides.max_listings {
            self.search.max_listings = max;
            self.evaluator.max_listings = max;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.search.max_listings == 0 {
            anyhow::bail!("search.max_listings must be at least 1");
        }

        if self.evaluator.max_listings == 0 {
            anyhow::bail!("evaluator.max_listings must be at least 1");
        }

        if self.marketplace.min_delay_ms > self.marketplace.max_delay_ms {
            anyhow::bail!(
                "marketplace.min_delay_ms ({}) cannot exceed max_delay_ms ({})",
                self.marketplace.min_delay_ms,
                self.marketplace.max_delay_ms
            );
        }

        url::Url::parse(&self.marketplace.base_url).context("Invalid marketplace.base_url")?;

        if self.scheduler.check_interval_minutes == 0 && self.scheduler.cron_expression.is_none()
        {
            anyhow::bail!("Scheduler interval must be > 0 or cron expression must be set");
        }

        Ok(())
    }

    /// The configured search, or an error naming the missing settings.
    pub fn search_target(&self) -> Result<SearchTarget> {
        SearchTarget::new(
            self.search.query.as_deref(),
            self.search.category.as_deref(),
            self.search.location.as_deref(),
        )
        .context("Set TORI_SEARCH_QUERY or TORI_PRODUCT_CATEGORY (or search.query / search.category)")
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.evaluator
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .context("OPENAI_API_KEY (evaluator.api_key) is required to evaluate listings")
    }

    pub fn require_report_path(&self) -> Result<PathBuf> {
        self.report_output_path()
            .context("HTML_OUTPUT_PATH (report.output_path) is required to render the report")
    }

    /// Bot token and chat id, required when notifications are sent.
    pub fn require_telegram(&self) -> Result<(&str, &str)> {
        let token = self
            .notifications
            .bot_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .context("TELEGRAM_BOT_TOKEN (notifications.bot_token) is required")?;
        let chat = self
            .notifications
            .chat_id
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .context("TELEGRAM_CHAT_ID (notifications.chat_id) is required")?;
        Ok((token, chat))
    }

    #[must_use]
    pub fn report_output_path(&self) -> Option<PathBuf> {
        self.report
            .output_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(expand_home)
    }
}

/// Expands a leading `~` to the home directory.
#[must_use]
pub fn expand_home(path: &str) -> PathBuf {
    let rest = if path == "~" {
        Some("")
    } else {
        path.strip_prefix("~/")
    };

    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
