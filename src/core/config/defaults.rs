use serde_json::{json, Value};

/// Built-in configuration, deep-merged under whatever `config.yml` provides.
pub fn default_config() -> Value {
    json!({
        "retrieval": {
            "collections": ["jazz_packages", "propakistani_packages", "ocr_packages"],
            "result_limit": 10,
            "max_parallel_queries": 8,
            "search_timeout_secs": 10,
        },
        "search": {
            "official_site": "jazz.com.pk",
            "aggregator_site": "propakistani.pk",
            "region": "pk-en",
            "recency": "y",
            "max_results": 5,
            "request_timeout_secs": 15,
        },
        "llm": {
            "model": "meta-llama/llama-4-scout-17b-16e-instruct",
            "base_url": "https://api.groq.com/openai/v1",
            "temperature": 0.5,
            "max_tokens": 512,
            "request_timeout_secs": 60,
        },
        "embedding": {
            "base_url": "http://localhost:1234",
            "model": "all-MiniLM-L6-v2",
            "request_timeout_secs": 30,
        },
        "ingest": {
            "sources": [
                {
                    "collection": "jazz_packages",
                    "embeddings_file": "jazz_package_embeddings.json",
                    "texts_file": "jazz_package_texts.json",
                },
                {
                    "collection": "propakistani_packages",
                    "embeddings_file": "propakistani_package_embeddings.json",
                    "texts_file": "propakistani_package_texts.json",
                },
                {
                    "collection": "ocr_packages",
                    "embeddings_file": "ocr_package_embeddings.json",
                    "texts_file": "ocr_package_texts.json",
                },
            ],
        },
    })
}
