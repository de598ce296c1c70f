use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::carousel::EasingType;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub carousel: CarouselConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the listings REST API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Retries on 429/503 before giving up (0 = single attempt)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// HTTP proxy URL (e.g., "http://127.0.0.1:7890" or "socks5://127.0.0.1:1080")
    #[serde(default)]
    pub proxy_url: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            proxy_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Listings requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Distance from the bottom (px) at which scroll polling asks for more
    #[serde(default = "default_scroll_threshold")]
    pub scroll_threshold_px: f64,
    /// Delay before asking the view to scroll the results into view
    #[serde(default = "default_scroll_settle")]
    pub scroll_settle_ms: u64,
    /// Name of the container the view scrolls to after a new search
    #[serde(default = "default_results_container")]
    pub results_container: String,
    /// Reject malformed responses instead of degrading to an empty page
    #[serde(default = "default_strict_contracts")]
    pub strict_contracts: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            scroll_threshold_px: default_scroll_threshold(),
            scroll_settle_ms: default_scroll_settle(),
            results_container: default_results_container(),
            strict_contracts: default_strict_contracts(),
        }
    }
}

impl FeedConfig {
    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a resolved image set stays fresh
    #[serde(default = "default_image_ttl")]
    pub image_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            image_ttl_secs: default_image_ttl(),
        }
    }
}

impl CacheConfig {
    pub fn image_ttl(&self) -> Duration {
        Duration::from_secs(self.image_ttl_secs)
    }
}

/// Auto-advance carousel timing and geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarouselConfig {
    /// Interval between auto-advance ticks
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Pixels moved per tick (sub-pixel values give continuous motion)
    #[serde(default = "default_step_size")]
    pub step_size: f64,
    /// Idle time after the last interaction before advancing resumes
    #[serde(default = "default_idle_resume")]
    pub idle_resume_ms: u64,
    /// Pause at the end of the range before rewinding
    #[serde(default = "default_rewind_grace")]
    pub rewind_grace_ms: u64,
    /// Duration of the eased rewind back to zero
    #[serde(default = "default_rewind_duration")]
    pub rewind_duration_ms: u64,
    /// Duration of a manual advance/retreat scroll
    #[serde(default = "default_step_animation")]
    pub step_animation_ms: u64,
    /// Frame rate of animation loops
    #[serde(default = "default_animation_fps")]
    pub animation_fps: u32,
    /// Tolerance (px) when comparing the position against the bounds
    #[serde(default = "default_end_epsilon")]
    pub end_epsilon: f64,
    /// Easing curve for the rewind and manual steps
    #[serde(default)]
    pub easing: EasingType,
    /// Container width tiers, widest first
    #[serde(default = "default_breakpoints")]
    pub breakpoints: Vec<Breakpoint>,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            step_size: default_step_size(),
            idle_resume_ms: default_idle_resume(),
            rewind_grace_ms: default_rewind_grace(),
            rewind_duration_ms: default_rewind_duration(),
            step_animation_ms: default_step_animation(),
            animation_fps: default_animation_fps(),
            end_epsilon: default_end_epsilon(),
            easing: EasingType::default(),
            breakpoints: default_breakpoints(),
        }
    }
}

impl CarouselConfig {
    #[inline]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    #[inline]
    pub fn idle_resume(&self) -> Duration {
        Duration::from_millis(self.idle_resume_ms)
    }

    #[inline]
    pub fn rewind_grace(&self) -> Duration {
        Duration::from_millis(self.rewind_grace_ms)
    }

    #[inline]
    pub fn rewind_duration(&self) -> Duration {
        Duration::from_millis(self.rewind_duration_ms)
    }

    #[inline]
    pub fn step_animation(&self) -> Duration {
        Duration::from_millis(self.step_animation_ms)
    }

    /// Interval between animation frames
    #[inline]
    pub fn frame_interval(&self) -> Duration {
        if self.animation_fps == 0 {
            Duration::from_millis(16) // ~60fps fallback
        } else {
            Duration::from_millis((1000 / self.animation_fps as u64).max(1))
        }
    }
}

/// A container width tier and the card geometry used inside it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    /// Smallest container width (px) this tier applies to
    pub min_width: f64,
    /// Card width (px)
    pub item_width: f64,
    /// Gap between cards (px)
    pub gap: f64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_page_size() -> u32 {
    12
}

fn default_scroll_threshold() -> f64 {
    300.0
}

fn default_scroll_settle() -> u64 {
    100
}

fn default_results_container() -> String {
    "search-results".to_string()
}

fn default_strict_contracts() -> bool {
    cfg!(debug_assertions)
}

fn default_image_ttl() -> u64 {
    300 // 5 minutes
}

fn default_tick_interval() -> u64 {
    20
}

fn default_step_size() -> f64 {
    0.5
}

fn default_idle_resume() -> u64 {
    3000
}

fn default_rewind_grace() -> u64 {
    1000
}

fn default_rewind_duration() -> u64 {
    600
}

fn default_step_animation() -> u64 {
    300
}

fn default_animation_fps() -> u32 {
    60
}

fn default_end_epsilon() -> f64 {
    2.0
}

fn default_breakpoints() -> Vec<Breakpoint> {
    vec![
        Breakpoint { min_width: 1024.0, item_width: 320.0, gap: 24.0 },
        Breakpoint { min_width: 640.0, item_width: 280.0, gap: 16.0 },
        Breakpoint { min_width: 0.0, item_width: 240.0, gap: 12.0 },
    ]
}

impl AppConfig {
    /// Load configuration from file or return defaults
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML text; missing sections take defaults
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> crate::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    /// Get the configuration file path
    /// Always uses ~/.config/nestfeed/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("nestfeed")
            .join("config.toml")
    }

    fn validate(&self) -> crate::Result<()> {
        if self.feed.page_size == 0 {
            return Err(crate::Error::Config("feed.page_size must be at least 1".into()));
        }
        if self.carousel.tick_interval_ms == 0 {
            return Err(crate::Error::Config(
                "carousel.tick_interval_ms must be at least 1".into(),
            ));
        }
        if self.carousel.breakpoints.is_empty() {
            return Err(crate::Error::Config(
                "carousel.breakpoints needs at least one tier".into(),
            ));
        }
        url::Url::parse(&self.api.base_url)?;
        Ok(())
    }
}
