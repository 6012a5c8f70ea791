use std::str::FromStr;

use crate::chunk::ChunkParams;
use crate::error::ConfigError;

pub const DEFAULT_LLM_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions";

#[derive(Debug, Clone)]
pub struct Config {
    pub llm_api_key: String,
    pub llm_base_url: String,
    pub generation_model: String,
    pub embedding_model: String,
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub qdrant_collection: String,
    pub chunking: ChunkParams,
    pub top_k: u64,
    pub max_upload_bytes: usize,
    pub bind_addr: String,
    pub session_idle_secs: u64,
    pub log_dir: String,
    pub json_logs: bool,
}

impl Config {
    /// Reads the process environment (after loading `.env`). Fails fast when
    /// no generation credential is configured.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.into());

        let llm_api_key = lookup("LLM_API_KEY")
            .or_else(|| lookup("GOOGLE_API_KEY"))
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("LLM_API_KEY (or GOOGLE_API_KEY)"))?;

        let chunking = ChunkParams::new(
            number(&lookup, "CHUNK_SIZE", 1000)?,
            number(&lookup, "CHUNK_OVERLAP", 200)?,
        )?;

        Ok(Self {
            llm_api_key,
            llm_base_url: var("LLM_BASE_URL", DEFAULT_LLM_BASE_URL),
            generation_model: var("GENERATION_MODEL", "gemini-2.5-pro"),
            embedding_model: var("EMBEDDING_MODEL", "sentence-transformers/all-MiniLM-L6-v2"),
            qdrant_url: var("QDRANT_URL", "http://localhost:6334"),
            qdrant_api_key: lookup("QDRANT_API_KEY").filter(|key| !key.is_empty()),
            qdrant_collection: var("QDRANT_COLLECTION", "ai-writing-assistant"),
            chunking,
            top_k: number(&lookup, "TOP_K", 4)?,
            max_upload_bytes: number(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            bind_addr: var("BIND_ADDR", "127.0.0.1:8501"),
            session_idle_secs: number(&lookup, "SESSION_IDLE_SECS", 3600)?,
            log_dir: var("LOG_DIR", "logs"),
            json_logs: var("LOG_FORMAT", "text").eq_ignore_ascii_case("json"),
        })
    }
}

fn number<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_missing_credential_is_fatal() {
        let err = Config::from_lookup(env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_google_key_fallback_and_defaults() {
        let config = Config::from_lookup(env(&[("GOOGLE_API_KEY", "g-key")])).unwrap();
        assert_eq!(config.llm_api_key, "g-key");
        assert_eq!(config.chunking.size(), 1000);
        assert_eq!(config.chunking.overlap(), 200);
        assert_eq!(config.qdrant_collection, "ai-writing-assistant");
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.session_idle_secs, 3600);
        assert!(!config.json_logs);
    }

    #[test]
    fn test_invalid_overlap_rejected() {
        let err = Config::from_lookup(env(&[
            ("LLM_API_KEY", "k"),
            ("CHUNK_SIZE", "100"),
            ("CHUNK_OVERLAP", "100"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Chunking(_)));
    }

    #[test]
    fn test_non_numeric_value_rejected() {
        let err =
            Config::from_lookup(env(&[("LLM_API_KEY", "k"), ("TOP_K", "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { name: "TOP_K", .. }));
    }
}
