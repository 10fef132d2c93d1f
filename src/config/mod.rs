// src/config/mod.rs
// All tunables load from the environment once, at first use.

use once_cell::sync::Lazy;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    // ── Server
    pub host: String,
    pub port: u16,
    pub log_level: String,

    // ── Provider upstreams
    pub openai_base_url: String,
    pub gemini_base_url: String,
    pub upstream_timeout_secs: u64,

    // ── Trace buffer
    pub trace_capacity: usize,

    // ── Streaming relay
    pub stream_chunks: usize,
    pub stream_delay_ms: u64,
    pub demo_slice_chars: usize,
    pub demo_delay_ms: u64,
}

fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            // Trim whitespace and strip trailing comments before parsing
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => {
                    eprintln!("Config: {} = {} (from environment)", key, clean_val);
                    parsed
                }
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        // Load from .env file first if it exists
        if dotenvy::dotenv().is_err() {
            eprintln!("Warning: .env file not found. Using environment variables and defaults.");
        }

        Self {
            host: env_var_or("WEAVER_HOST", "0.0.0.0".to_string()),
            port: env_var_or("WEAVER_PORT", 4101),
            log_level: env_var_or("WEAVER_LOG_LEVEL", "info".to_string()),
            openai_base_url: env_var_or("OPENAI_BASE_URL", "https://api.openai.com/v1".to_string()),
            gemini_base_url: env_var_or(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta".to_string(),
            ),
            upstream_timeout_secs: env_var_or("WEAVER_UPSTREAM_TIMEOUT_SECS", 120),
            trace_capacity: env_var_or("WEAVER_TRACE_CAPACITY", 200),
            stream_chunks: env_var_or("WEAVER_STREAM_CHUNKS", 5),
            stream_delay_ms: env_var_or("WEAVER_STREAM_DELAY_MS", 80),
            demo_slice_chars: env_var_or("WEAVER_DEMO_SLICE_CHARS", 24),
            demo_delay_ms: env_var_or("WEAVER_DEMO_DELAY_MS", 120),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Global config instance - loaded once at startup
pub static CONFIG: Lazy<GatewayConfig> = Lazy::new(GatewayConfig::from_env);
