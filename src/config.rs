use std::time::Duration;

use chrono::{NaiveTime, Weekday};

use crate::error::{AppError, Result};
use crate::scheduler::{Schedule, TimeWindow};

pub const LIVE_URL: &str = "https://www.sharesansar.com/live-trading";
pub const WEEK52_URL: &str = "https://www.sharesansar.com/today-share-price";
pub const SUMMARY_URL: &str = "https://nepsealpha.com/live-market/";

/// Exchange-local timezone. All timestamps and schedule windows use it.
pub const MARKET_TZ: chrono_tz::Tz = chrono_tz::Asia::Kathmandu;

/// NEPSE trades Sunday through Thursday.
pub const TRADING_DAYS: &[Weekday] = &[
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
];

/// Market open/close, exchange-local (hour, minute).
pub const MARKET_OPEN: (u32, u32) = (11, 0);
pub const MARKET_CLOSE: (u32, u32) = (15, 0);

/// Sentinel for any field that is missing or not usable.
pub const NA: &str = "N/A";

/// Served at `/` until the first report has been generated.
pub const PENDING_STATUS: &str = "NEPSE live report is being prepared. Check back shortly.";

/// Telegram long-poll timeout passed to getUpdates (seconds).
pub const BOT_POLL_TIMEOUT_SECS: u64 = 30;

/// Pause after a failed getUpdates call before polling again.
pub const BOT_ERROR_PAUSE_SECS: u64 = 5;

pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleMode {
    /// Fire every `REFRESH_INTERVAL_MINS`.
    Interval,
    /// Fire every `WINDOW_STEP_MINS` inside trading hours only.
    MarketHours,
}

#[derive(Debug, Clone)]
pub struct FtpConfig {
    pub host: String,
    pub user: String,
    pub pass: String,
    pub dir: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub port: u16,
    pub live_url: String,
    pub week52_url: String,
    pub summary_url: String,
    pub http_timeout: Duration,
    pub schedule_mode: ScheduleMode,
    pub refresh_interval_mins: u64,
    pub window_step_mins: u32,
    /// Local copy of the rendered report (OUTPUT_PATH). Empty disables it.
    pub output_path: String,
    /// Present only when FTP_HOST is set.
    pub ftp: Option<FtpConfig>,
    pub telegram_bot_token: Option<String>,
    pub telegram_api_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse config from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let schedule_mode = match get("SCHEDULE_MODE", "interval").to_lowercase().as_str() {
            "interval" => ScheduleMode::Interval,
            "market-hours" | "market_hours" | "cron" => ScheduleMode::MarketHours,
            other => {
                return Err(AppError::Config(format!(
                    "SCHEDULE_MODE must be 'interval' or 'market-hours', got '{other}'"
                )))
            }
        };

        Ok(Self {
            log_level: get("LOG_LEVEL", "info"),
            port: get("PORT", "5000")
                .parse::<u16>()
                .map_err(|_| AppError::Config("PORT must be a valid port number".to_string()))?,
            live_url: get("LIVE_URL", LIVE_URL),
            week52_url: get("WEEK52_URL", WEEK52_URL),
            summary_url: get("SUMMARY_URL", SUMMARY_URL),
            http_timeout: Duration::from_secs(get("HTTP_TIMEOUT_SECS", "30").parse::<u64>().map_err(
                |_| AppError::Config("HTTP_TIMEOUT_SECS must be a whole number".to_string()),
            )?),
            schedule_mode,
            refresh_interval_mins: get("REFRESH_INTERVAL_MINS", "15")
                .parse::<u64>()
                .ok()
                .filter(|m| *m > 0)
                .ok_or_else(|| {
                    AppError::Config("REFRESH_INTERVAL_MINS must be a positive number".to_string())
                })?,
            window_step_mins: get("WINDOW_STEP_MINS", "5")
                .parse::<u32>()
                .ok()
                .filter(|m| *m > 0)
                .ok_or_else(|| {
                    AppError::Config("WINDOW_STEP_MINS must be a positive number".to_string())
                })?,
            output_path: get("OUTPUT_PATH", "index.html"),
            ftp: ftp_from_lookup(&var)?,
            telegram_bot_token: var("TELEGRAM_BOT_TOKEN").filter(|t| !t.trim().is_empty()),
            telegram_api_url: get("TELEGRAM_API_URL", TELEGRAM_API_URL),
        })
    }

    /// Build the trigger schedule selected by SCHEDULE_MODE.
    pub fn schedule(&self) -> Schedule {
        match self.schedule_mode {
            ScheduleMode::Interval => {
                Schedule::Interval(Duration::from_secs(self.refresh_interval_mins * 60))
            }
            ScheduleMode::MarketHours => Schedule::Windows(vec![trading_window(self.window_step_mins)]),
        }
    }
}

/// Trading days between open and close, every `step_mins`.
pub fn trading_window(step_mins: u32) -> TimeWindow {
    TimeWindow {
        days: TRADING_DAYS.to_vec(),
        start: NaiveTime::from_hms_opt(MARKET_OPEN.0, MARKET_OPEN.1, 0).unwrap_or_default(),
        end: NaiveTime::from_hms_opt(MARKET_CLOSE.0, MARKET_CLOSE.1, 0).unwrap_or_default(),
        step_mins,
    }
}

/// Trading session. Outside it live data is stale.
pub fn market_hours() -> TimeWindow {
    trading_window(1)
}

fn ftp_from_lookup<F>(var: &F) -> Result<Option<FtpConfig>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(host) = var("FTP_HOST").filter(|h| !h.trim().is_empty()) else {
        return Ok(None);
    };
    let user = var("FTP_USER")
        .ok_or_else(|| AppError::Config("FTP_USER is required when FTP_HOST is set".to_string()))?;
    let pass = var("FTP_PASS")
        .ok_or_else(|| AppError::Config("FTP_PASS is required when FTP_HOST is set".to_string()))?;
    Ok(Some(FtpConfig {
        host,
        user,
        pass,
        dir: var("FTP_DIR").unwrap_or_else(|| "/htdocs".to_string()),
    }))
}

#[cfg(test)]
impl Config {
    /// Defaults with every outbound URL pointed at a test server.
    pub fn for_test(base_url: &str) -> Self {
        Self {
            log_level: "debug".to_string(),
            port: 0,
            live_url: format!("{base_url}/live-trading"),
            week52_url: format!("{base_url}/today-share-price"),
            summary_url: format!("{base_url}/live-market"),
            http_timeout: Duration::from_secs(5),
            schedule_mode: ScheduleMode::Interval,
            refresh_interval_mins: 15,
            window_step_mins: 5,
            output_path: String::new(),
            ftp: None,
            telegram_bot_token: None,
            telegram_api_url: base_url.to_string(),
        }
    }
}
