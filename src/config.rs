use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use dotenvy::dotenv;
use std::env;

use crate::attendance::classifier::StatusClassifier;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,

    // QR tokens
    pub jwt_secret: String,
    pub qr_token_ttl: usize,

    // Status classifier thresholds (local time of day)
    pub late_from: NaiveTime,
    pub half_day_from: NaiveTime,

    /// The organization's timezone, explicit rather than process-local.
    /// "Today" and "now" for attendance bucketing derive from this.
    pub org_utc_offset_minutes: i32,

    // Rate limiting for the public kiosk surfaces
    pub rate_mark_per_min: u32,
    pub rate_qr_per_min: u32,

    pub api_prefix: String,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn time_var(key: &str, default: &str) -> NaiveTime {
    let raw = env_or(key, default);
    NaiveTime::parse_from_str(&raw, "%H:%M")
        .unwrap_or_else(|_| panic!("{} must be HH:MM, got {}", key, raw))
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            qr_token_ttl: env_or("QR_TOKEN_TTL", "600").parse().unwrap(), // 10 min
            late_from: time_var("ATTENDANCE_LATE_FROM", "09:15"),
            half_day_from: time_var("ATTENDANCE_HALF_DAY_FROM", "12:00"),
            org_utc_offset_minutes: env_or("ORG_UTC_OFFSET_MINUTES", "0").parse().unwrap(),
            rate_mark_per_min: env_or("RATE_MARK_PER_MIN", "120").parse().unwrap(),
            rate_qr_per_min: env_or("RATE_QR_PER_MIN", "60").parse().unwrap(),
            api_prefix: env_or("API_PREFIX", "/api"),
        }
    }

    pub fn classifier(&self) -> StatusClassifier {
        StatusClassifier::new(self.late_from, self.half_day_from)
    }

    /// Wall-clock now in the organization's timezone.
    pub fn local_now(&self) -> NaiveDateTime {
        let offset = FixedOffset::east_opt(self.org_utc_offset_minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
        Utc::now().with_timezone(&offset).naive_local()
    }

    /// The calendar day attendance buckets into right now.
    pub fn local_today(&self) -> NaiveDate {
        self.local_now().date()
    }
}
