use anyhow::Result;
use config::{Config, Environment};
use serde::{Deserialize, Serialize};

/// Runtime configuration, sourced from the process environment (a `.env`
/// file is honored in development). `GEMINI_API_KEY` has no default; loading
/// fails without it and startup aborts.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_vision_model: String,
    pub gemini_timeout_seconds: u64,

    pub max_message_length: usize,
    pub rate_limit_per_minute: usize,
    pub conversation_timeout: u64,
    pub sweep_interval_seconds: u64,

    pub knowledge_base_path: String,
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8000)?
            .set_default("gemini_model", "gemini-1.5-flash")?
            .set_default("gemini_vision_model", "gemini-1.5-flash-latest")?
            .set_default("gemini_timeout_seconds", 60)?
            .set_default("max_message_length", 5000)?
            .set_default("rate_limit_per_minute", 10)?
            .set_default("conversation_timeout", 1800)?
            .set_default("sweep_interval_seconds", 300)?
            .set_default("knowledge_base_path", "config/disease_info.json")?
            .add_source(Environment::default().try_parsing(true))
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }
}
