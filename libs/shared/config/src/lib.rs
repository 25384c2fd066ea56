use std::env;
use std::str::FromStr;
use tracing::warn;

const DEFAULT_SLOT_GRANULARITY_MINUTES: i64 = 30;
const DEFAULT_PAGE_SIZE: u32 = 10;
const DEFAULT_MAX_PAGE_SIZE: u32 = 100;
const MINUTES_PER_DAY: i64 = 24 * 60;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_token: Option<String>,
    pub scheduling: SchedulingSettings,
}

/// Tunables consumed by the scheduling core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulingSettings {
    pub slot_granularity_minutes: i64,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for SchedulingSettings {
    fn default() -> Self {
        Self {
            slot_granularity_minutes: DEFAULT_SLOT_GRANULARITY_MINUTES,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl AppConfig {
    /// Loads a `.env` file if one exists, then reads the environment.
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::from_env()
    }

    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_token: env::var("SUPABASE_SERVICE_TOKEN").ok(),
            scheduling: SchedulingSettings::from_env(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

impl SchedulingSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let slot_granularity_minutes = checked_granularity(
            parse_var("SLOT_GRANULARITY_MINUTES", defaults.slot_granularity_minutes),
            defaults.slot_granularity_minutes,
        );

        let max_page_size = parse_var("MAX_PAGE_SIZE", defaults.max_page_size).max(1);
        let default_page_size = parse_var("DEFAULT_PAGE_SIZE", defaults.default_page_size)
            .clamp(1, max_page_size);

        Self {
            slot_granularity_minutes,
            default_page_size,
            max_page_size,
        }
    }
}

/// Slot lengths run from one minute to a full day.
fn checked_granularity(minutes: i64, default: i64) -> i64 {
    if (1..=MINUTES_PER_DAY).contains(&minutes) {
        minutes
    } else {
        warn!(
            "SLOT_GRANULARITY_MINUTES must be between 1 and {}, got {}; using default {}",
            MINUTES_PER_DAY, minutes, default
        );
        default
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_thirty_minute_slots() {
        let settings = SchedulingSettings::default();
        assert_eq!(settings.slot_granularity_minutes, 30);
        assert_eq!(settings.default_page_size, 10);
        assert_eq!(settings.max_page_size, 100);
    }

    #[test]
    fn invalid_numeric_values_fall_back_to_default() {
        env::set_var("SHARED_CONFIG_TEST_NUMBER", "not-a-number");
        assert_eq!(parse_var("SHARED_CONFIG_TEST_NUMBER", 42u32), 42);
        env::set_var("SHARED_CONFIG_TEST_NUMBER", " 15 ");
        assert_eq!(parse_var("SHARED_CONFIG_TEST_NUMBER", 42u32), 15);
        env::remove_var("SHARED_CONFIG_TEST_NUMBER");
    }

    #[test]
    fn granularity_outside_one_day_falls_back() {
        assert_eq!(checked_granularity(15, 30), 15);
        assert_eq!(checked_granularity(MINUTES_PER_DAY, 30), MINUTES_PER_DAY);
        assert_eq!(checked_granularity(0, 30), 30);
        assert_eq!(checked_granularity(MINUTES_PER_DAY + 1, 30), 30);
        assert_eq!(checked_granularity(i64::MAX, 30), 30);
    }
}
