//! Answer composer — one grounded prompt, one chat-completion call.

use std::sync::Arc;

use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::retrieval::FusedResults;

use crate::core::errors::ApiError;

pub struct AnswerComposer {
    llm: Arc<dyn LlmProvider>,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl AnswerComposer {
    pub fn new(llm: Arc<dyn LlmProvider>, model: String, temperature: f64, max_tokens: u32) -> Self {
        Self {
            llm,
            model,
            temperature,
            max_tokens,
        }
    }

    /// Assemble the grounded prompt: persona, retrieved context labelled by
    /// source, optional web section, the question, and answer instructions.
    pub fn build_prompt(query: &str, fused: &FusedResults, web_section: Option<&str>) -> String {
        let mut retrieved_info = String::new();
        for (document, metadata, _) in fused.iter() {
            let source = metadata
                .get("source")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown");
            retrieved_info.push_str(&format!("Source: {source}\n{document}\n\n"));
        }

        let mut prompt = format!(
            "You are JazzBot, a helpful assistant for Jazz, the mobile telecom company in Pakistan. \
             Your job is to help users find the best mobile packages including internet, SMS, and call bundles.\n\n\
             Here are the top relevant results from our database (including dummy, scraped, and OCR data):\n\
             {retrieved_info}\n\n"
        );

        if let Some(section) = web_section {
            prompt.push_str(section);
            prompt.push_str("\n\n");
        }

        prompt.push_str(&format!(
            "The user asked: \"{query}\"\n\n\
             Based only on the information provided above, respond with a list of packages or information \
             that matches the user's request. Mention the source (jazz_packages, scraped_data, or ocr_data) \
             for each piece of information.\n\n\
             If no exact matches are found, politely inform the user that no matching information was found."
        ));

        prompt
    }

    /// Single attempt against the chat-completion endpoint. A downstream
    /// failure comes back as an error-prefixed string, not an error.
    pub async fn answer(
        &self,
        query: &str,
        fused: &FusedResults,
        web_section: Option<&str>,
    ) -> String {
        let prompt = Self::build_prompt(query, fused, web_section);
        let request = ChatRequest::new(vec![ChatMessage::user(prompt)])
            .with_sampling(self.temperature, self.max_tokens);

        match self.llm.chat(request, &self.model).await {
            Ok(content) => content,
            Err(ApiError::Internal(body)) => format!("Error: {body}"),
            Err(err) => format!("Error: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct MockLlm {
        reply: Result<String, String>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl MockLlm {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing(body: &str) -> Self {
            Self {
                reply: Err(body.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlm {
        fn name(&self) -> &str {
            "mock"
        }

        async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
            self.requests.lock().unwrap().push(request);
            match &self.reply {
                Ok(content) => Ok(content.clone()),
                Err(body) => Err(ApiError::Internal(body.clone())),
            }
        }
    }

    fn fused() -> FusedResults {
        FusedResults::from_parts(
            vec!["Weekly Mega: 10GB, Rs 250".to_string()],
            vec![json!({"source": "jazz_packages"})],
            vec![0.1],
        )
        .unwrap()
    }

    #[test]
    fn prompt_labels_context_by_source() {
        let prompt = AnswerComposer::build_prompt("weekly bundles?", &fused(), None);

        assert!(prompt.contains("You are JazzBot"));
        assert!(prompt.contains("Source: jazz_packages\nWeekly Mega: 10GB, Rs 250"));
        assert!(prompt.contains("The user asked: \"weekly bundles?\""));
        assert!(!prompt.contains("found online"));
    }

    #[test]
    fn prompt_includes_web_section_when_present() {
        let prompt = AnswerComposer::build_prompt(
            "latest offers",
            &fused(),
            Some("Latest packages found online:\n\n1. Weekly Mega Plus"),
        );

        assert!(prompt.contains("Latest packages found online:"));
        assert!(prompt.contains("Weekly Mega Plus"));
    }

    #[test]
    fn unknown_source_is_labelled_unknown() {
        let fused = FusedResults::from_parts(
            vec!["Mystery bundle".to_string()],
            vec![json!({})],
            vec![0.2],
        )
        .unwrap();

        let prompt = AnswerComposer::build_prompt("q", &fused, None);
        assert!(prompt.contains("Source: Unknown\nMystery bundle"));
    }

    #[tokio::test]
    async fn completion_text_is_returned_verbatim() {
        let composer = AnswerComposer::new(
            Arc::new(MockLlm::replying("Here are the weekly bundles.")),
            "test-model".to_string(),
            0.5,
            512,
        );

        let answer = composer.answer("weekly?", &fused(), None).await;
        assert_eq!(answer, "Here are the weekly bundles.");
    }

    #[tokio::test]
    async fn downstream_failure_becomes_error_string() {
        let composer = AnswerComposer::new(
            Arc::new(MockLlm::failing("{\"error\": \"model overloaded\"}")),
            "test-model".to_string(),
            0.5,
            512,
        );

        let answer = composer.answer("weekly?", &fused(), None).await;
        assert_eq!(answer, "Error: {\"error\": \"model overloaded\"}");
    }

    #[tokio::test]
    async fn sampling_parameters_reach_the_request() {
        let llm = Arc::new(MockLlm::replying("ok"));
        let composer = AnswerComposer::new(llm.clone(), "m".to_string(), 0.5, 512);

        composer.answer("q", &fused(), None).await;

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].temperature, Some(0.5));
        assert_eq!(requests[0].max_tokens, Some(512));
    }
}
