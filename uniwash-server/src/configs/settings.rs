use std::env;
use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use time::UtcOffset;

use crate::configs::normalize_path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub migration_path: Option<String>,
    pub clean_start: bool,
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auth {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sms {
    pub base_url: String,
    pub api_key: String,
    pub provider: String,
    /// Every message is redirected here outside production.
    pub developer_mobile: String,
    #[serde(default = "default_sms_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scheduler {
    #[serde(default = "default_turn_on_spec")]
    pub turn_on_spec: String,
    #[serde(default = "default_turn_off_spec")]
    pub turn_off_spec: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            turn_on_spec: default_turn_on_spec(),
            turn_off_spec: default_turn_off_spec(),
            batch_size: default_batch_size(),
        }
    }
}

impl Scheduler {
    pub fn turn_on_interval(&self) -> Result<Duration, ConfigError> {
        parse_every(&self.turn_on_spec)
    }

    pub fn turn_off_interval(&self) -> Result<Duration, ConfigError> {
        parse_every(&self.turn_off_spec)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub logger: Logger,
    pub database: Database,
    pub auth: Auth,
    pub sms: Sms,
    #[serde(default)]
    pub scheduler: Scheduler,
    #[serde(default)]
    pub production: bool,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        let mut settings: Settings = Config::builder()
            .add_source(File::with_name("configs/default"))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(Environment::with_prefix("UNIWASH").separator("__"))
            .build()?
            .try_deserialize()?;

        if let Some(migrate) = &settings.database.migration_path {
            if Path::new(migrate).is_dir() {
                let migrate_path = normalize_path(migrate)
                    .map_err(|e| ConfigError::Message(e.to_string()))?
                    .to_string_lossy()
                    .to_string();

                settings.database.migration_path = Some(migrate_path);
            } else {
                settings.database.migration_path = None;
            }
        }

        settings.validate()?;

        Ok(settings)
    }

    /// Rejects values that would otherwise only fail once the scheduler or
    /// the reservation store first touches them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler.turn_on_interval()?;
        self.scheduler.turn_off_interval()?;
        self.utc_offset()?;

        if self.scheduler.batch_size == 0 {
            return Err(ConfigError::Message("scheduler.batch_size must be positive".into()));
        }
        if self.sms.timeout_secs == 0 {
            return Err(ConfigError::Message("sms.timeout_secs must be positive".into()));
        }

        Ok(())
    }

    pub fn utc_offset(&self) -> Result<UtcOffset, ConfigError> {
        resolve_offset(&self.timezone)
    }

    pub fn sms_timeout(&self) -> Duration {
        Duration::from_secs(self.sms.timeout_secs)
    }
}

/// Parses `@every <n><unit>` schedule specs, unit being `s`, `m` or `h`.
pub fn parse_every(spec: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::Message(format!("unsupported schedule spec: {spec:?}"));

    let every = spec.trim().strip_prefix("@every").ok_or_else(invalid)?.trim();
    if every.len() < 2 {
        return Err(invalid());
    }

    let (split, unit) = every.char_indices().last().ok_or_else(invalid)?;
    let amount: u64 = every[..split].parse().map_err(|_| invalid())?;
    if amount == 0 {
        return Err(invalid());
    }

    let scale = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        _ => return Err(invalid()),
    };

    amount.checked_mul(scale).map(Duration::from_secs).ok_or_else(invalid)
}

/// Maps a zone name to its offset. Iran has kept a fixed +03:30 since
/// daylight saving was abolished in 2022.
pub fn resolve_offset(zone: &str) -> Result<UtcOffset, ConfigError> {
    let invalid = || ConfigError::Message(format!("unsupported timezone: {zone:?}"));

    match zone {
        "Asia/Tehran" => UtcOffset::from_hms(3, 30, 0).map_err(|_| invalid()),
        "UTC" | "Etc/UTC" => Ok(UtcOffset::UTC),
        literal => {
            let (sign, rest) = match literal.as_bytes().first() {
                Some(b'+') => (1, &literal[1..]),
                Some(b'-') => (-1, &literal[1..]),
                _ => return Err(invalid()),
            };
            let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
            let hours: i8 = hours.parse().map_err(|_| invalid())?;
            let minutes: i8 = minutes.parse().map_err(|_| invalid())?;

            UtcOffset::from_hms(sign * hours, sign * minutes, 0).map_err(|_| invalid())
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    5
}

fn default_sms_timeout() -> u64 {
    5
}

fn default_turn_on_spec() -> String {
    String::from("@every 10s")
}

fn default_turn_off_spec() -> String {
    String::from("@every 1m")
}

fn default_batch_size() -> u32 {
    100
}

fn default_timezone() -> String {
    String::from("Asia/Tehran")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_spec() {
        assert_eq!(parse_every("@every 10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_every("@every 1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_every(" @every 2h ").unwrap(), Duration::from_secs(7200));

        assert!(parse_every("*/5 * * * *").is_err());
        assert!(parse_every("@every 0s").is_err());
        assert!(parse_every("@every 10d").is_err());
        assert!(parse_every("@every s").is_err());
        assert!(parse_every("@every 10ś").is_err());
        assert!(parse_every("@every 18446744073709551615h").is_err());
    }

    #[test]
    fn test_validate_rejects_zero_sms_timeout() {
        let mut settings = Settings {
            server: Server {
                host: String::from("127.0.0.1"),
                port: 0,
            },
            logger: Logger {
                level: String::from("info"),
            },
            database: Database {
                migration_path: None,
                clean_start: true,
                url: String::from("sqlite::memory:"),
                max_connections: default_max_connections(),
                acquire_timeout_secs: default_acquire_timeout(),
            },
            auth: Auth {
                secret: String::from("test"),
                expiration: 60,
            },
            sms: Sms {
                base_url: String::from("http://127.0.0.1:9"),
                api_key: String::new(),
                provider: String::from("kavenegar"),
                developer_mobile: String::from("09350000000"),
                timeout_secs: default_sms_timeout(),
            },
            scheduler: Scheduler::default(),
            production: false,
            timezone: default_timezone(),
        };
        assert!(settings.validate().is_ok());

        settings.sms.timeout_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_resolve_offset() {
        assert_eq!(resolve_offset("Asia/Tehran").unwrap().whole_minutes(), 210);
        assert_eq!(resolve_offset("UTC").unwrap(), UtcOffset::UTC);
        assert_eq!(resolve_offset("-04:30").unwrap().whole_minutes(), -270);
        assert!(resolve_offset("Mars/Olympus").is_err());
    }

    #[test]
    fn test_scheduler_defaults() {
        let scheduler = Scheduler::default();

        assert_eq!(scheduler.turn_on_interval().unwrap(), Duration::from_secs(10));
        assert_eq!(scheduler.turn_off_interval().unwrap(), Duration::from_secs(60));
        assert_eq!(scheduler.batch_size, 100);
    }
}
