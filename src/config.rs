//! Process-wide configuration.
//!
//! Built once at process start and passed explicitly to whatever needs
//! it, rather than through a mutable global lookup at runtime.

use std::env;
use std::time::Duration;

/// Application configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub artifact_store_path: String,
    pub broker_url: String,
    pub database_url: String,
    pub model_path_phase_classifier: Option<String>,
    pub log_json: bool,
    pub correlation_id_header: String,
    pub max_retries_ingestion: u32,
    pub max_retries_video: u32,
    pub max_retries_calibration: u32,
    pub job_deadline: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let artifact_store_path = env::var("ARTIFACT_STORE_PATH")
            .unwrap_or_else(|_| "./artifacts".to_string());

        let broker_url =
            env::var("BROKER_URL").unwrap_or_else(|_| "memory://default".to_string());

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "memory://pitchsense".to_string());

        let model_path_phase_classifier = env::var("MODEL_PATH_PHASE_CLASSIFIER").ok();

        let log_json = env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let correlation_id_header = env::var("CORRELATION_ID_HEADER")
            .unwrap_or_else(|_| "X-Correlation-ID".to_string());

        let max_retries_ingestion = env::var("MAX_RETRIES_INGESTION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);

        let max_retries_video = env::var("MAX_RETRIES_VIDEO")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);

        let max_retries_calibration = env::var("MAX_RETRIES_CALIBRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);

        let job_deadline_secs: u64 = env::var("JOB_DEADLINE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(600);

        Ok(Self {
            artifact_store_path,
            broker_url,
            database_url,
            model_path_phase_classifier,
            log_json,
            correlation_id_header,
            max_retries_ingestion,
            max_retries_video,
            max_retries_calibration,
            job_deadline: Duration::from_secs(job_deadline_secs),
        })
    }
}

/// Initializes the global tracing subscriber from `cfg.log_json`.
/// Idempotent guard is the caller's responsibility (call once from `main`).
pub fn init_tracing(cfg: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
