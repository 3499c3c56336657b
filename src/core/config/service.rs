use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use super::defaults::default_config;
use super::paths::AppPaths;

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("JAZZBOT_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    /// Load the effective configuration: built-in defaults deep-merged with
    /// whatever `config.yml` provides. Always returns an object.
    pub fn load_config(&self) -> Value {
        let file_config = load_yaml_file(&self.config_path());
        deep_merge(&default_config(), &file_config)
    }

    // -----------------------------------------------------------------------
    // Typed accessors
    // -----------------------------------------------------------------------

    pub fn collections(&self) -> Vec<String> {
        let config = self.load_config();
        config
            .get("retrieval")
            .and_then(|v| v.get("collections"))
            .and_then(|v| v.as_array())
            .map(|list| {
                list.iter()
                    .filter_map(|item| item.as_str())
                    .map(|item| item.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn result_limit(&self) -> usize {
        self.usize_at(&["retrieval", "result_limit"], 10)
    }

    pub fn max_parallel_queries(&self) -> usize {
        self.usize_at(&["retrieval", "max_parallel_queries"], 8)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.u64_at(&["retrieval", "search_timeout_secs"], 10))
    }

    pub fn llm_model(&self) -> String {
        self.string_at(
            &["llm", "model"],
            "meta-llama/llama-4-scout-17b-16e-instruct",
        )
    }

    pub fn llm_base_url(&self) -> String {
        self.string_at(&["llm", "base_url"], "https://api.groq.com/openai/v1")
    }

    pub fn llm_temperature(&self) -> f64 {
        self.f64_at(&["llm", "temperature"], 0.5)
    }

    pub fn llm_max_tokens(&self) -> u32 {
        self.u64_at(&["llm", "max_tokens"], 512) as u32
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.u64_at(&["llm", "request_timeout_secs"], 60))
    }

    /// The Groq credential. Environment wins over the config file so the key
    /// never has to be written to disk.
    pub fn groq_api_key(&self) -> Option<String> {
        if let Ok(key) = env::var("GROQ_API_KEY") {
            if !key.trim().is_empty() {
                return Some(key);
            }
        }

        let config = self.load_config();
        config
            .get("llm")
            .and_then(|v| v.get("api_key"))
            .and_then(|v| v.as_str())
            .filter(|key| !key.trim().is_empty())
            .map(|key| key.to_string())
    }

    pub fn embedding_base_url(&self) -> String {
        self.string_at(&["embedding", "base_url"], "http://localhost:1234")
    }

    pub fn embedding_model(&self) -> String {
        self.string_at(&["embedding", "model"], "all-MiniLM-L6-v2")
    }

    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.u64_at(&["embedding", "request_timeout_secs"], 30))
    }

    pub fn official_site(&self) -> String {
        self.string_at(&["search", "official_site"], "jazz.com.pk")
    }

    pub fn aggregator_site(&self) -> String {
        self.string_at(&["search", "aggregator_site"], "propakistani.pk")
    }

    pub fn search_region(&self) -> String {
        self.string_at(&["search", "region"], "pk-en")
    }

    pub fn search_recency(&self) -> String {
        self.string_at(&["search", "recency"], "y")
    }

    pub fn web_max_results(&self) -> usize {
        self.usize_at(&["search", "max_results"], 5)
    }

    pub fn web_timeout(&self) -> Duration {
        Duration::from_secs(self.u64_at(&["search", "request_timeout_secs"], 15))
    }

    pub fn ingest_sources(&self) -> Vec<Value> {
        let config = self.load_config();
        config
            .get("ingest")
            .and_then(|v| v.get("sources"))
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Lookup helpers
    // -----------------------------------------------------------------------

    fn value_at(&self, path: &[&str]) -> Option<Value> {
        let mut current = self.load_config();
        for key in path {
            current = current.get(key)?.clone();
        }
        Some(current)
    }

    fn string_at(&self, path: &[&str], fallback: &str) -> String {
        self.value_at(path)
            .and_then(|v| v.as_str().map(|s| s.to_string()))
            .unwrap_or_else(|| fallback.to_string())
    }

    fn u64_at(&self, path: &[&str], fallback: u64) -> u64 {
        self.value_at(path)
            .and_then(|v| v.as_u64())
            .unwrap_or(fallback)
    }

    fn usize_at(&self, path: &[&str], fallback: usize) -> usize {
        self.u64_at(path, fallback as u64) as usize
    }

    fn f64_at(&self, path: &[&str], fallback: f64) -> f64 {
        self.value_at(path)
            .and_then(|v| v.as_f64())
            .unwrap_or(fallback)
    }
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value) => match value {
                Value::Object(_) => value,
                _ => Value::Object(Map::new()),
            },
            Err(err) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(_) => Value::Object(Map::new()),
    }
}

fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, overlay_value) in overlay_map {
                let merged_value = match merged.get(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => overlay.clone(),
    }
}
