use std::time::{Duration, TryFromFloatSecsError};

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

pub const CURRENT_CALENDAR_URL: &str = "https://www.federalreserve.gov/monetarypolicy/fomccalendars.htm";
pub const HISTORICAL_INDEX_URL: &str =
    "https://www.federalreserve.gov/monetarypolicy/fomc_historical_year.htm";
pub const BASE_URL: &str = "https://www.federalreserve.gov";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Runtime settings: defaults, then `fomc.toml` in the working directory,
/// then `FOMC_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub current_url: String,
    pub historical_index_url: String,
    pub base_url: String,
    pub timeout_secs: f64,
    pub max_retries: u32,
    pub backoff: f64,
    pub pacing_ms: u64,
    pub user_agent: String,
    pub db_path: String,
    /// First year whose `fomccalendars{year}.htm` page is tried directly.
    pub direct_pages_from: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            current_url: CURRENT_CALENDAR_URL.to_string(),
            historical_index_url: HISTORICAL_INDEX_URL.to_string(),
            base_url: BASE_URL.to_string(),
            timeout_secs: 20.0,
            max_retries: 3,
            backoff: 1.5,
            pacing_ms: 600,
            user_agent: USER_AGENT.to_string(),
            db_path: "data/fomc.sqlite".to_string(),
            direct_pages_from: 2010,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name("fomc").required(false))
            .add_source(Environment::with_prefix("FOMC").try_parsing(true))
            .build()?
            .try_deserialize::<Settings>()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that cannot become durations.
    pub fn validate(&self) -> Result<()> {
        self.timeout()
            .with_context(|| format!("invalid timeout_secs {}", self.timeout_secs))?;
        if !self.backoff.is_finite() || self.backoff < 0.0 {
            bail!("invalid backoff {}", self.backoff);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Result<Duration, TryFromFloatSecsError> {
        Duration::try_from_secs_f64(self.timeout_secs)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}
