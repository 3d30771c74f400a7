use chrono::NaiveTime;
use dotenvy::dotenv;
use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,
    pub api_prefix: String,

    // Face recognition
    pub face_backend: String,
    pub face_extractor_cmd: Option<String>,
    pub face_tolerance: f64,

    /// Check-ins after this time of day are marked late.
    pub late_after: NaiveTime,

    // Rate limiting
    pub rate_recognize_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_protected_per_min: u32,

    pub event_capacity: usize,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),

            face_backend: env::var("FACE_BACKEND").unwrap_or_else(|_| "disabled".to_string()),
            face_extractor_cmd: env::var("FACE_EXTRACTOR_CMD").ok(),
            face_tolerance: env::var("FACE_TOLERANCE")
                .unwrap_or_else(|_| "0.6".to_string())
                .parse()
                .expect("FACE_TOLERANCE must be a number"),

            late_after: NaiveTime::parse_from_str(
                &env::var("LATE_AFTER").unwrap_or_else(|_| "09:00:00".to_string()),
                "%H:%M:%S",
            )
            .expect("LATE_AFTER must be HH:MM:SS"),

            rate_recognize_per_min: env::var("RATE_RECOGNIZE_PER_MIN")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap(),
            rate_register_per_min: env::var("RATE_REGISTER_PER_MIN")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap(),
            rate_protected_per_min: env::var("RATE_PROTECTED_PER_MIN")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap(),

            event_capacity: env::var("EVENT_CAPACITY")
                .unwrap_or_else(|_| "256".to_string())
                .parse()
                .unwrap(),
        }
    }
}
