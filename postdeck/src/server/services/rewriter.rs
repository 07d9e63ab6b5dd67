use serde::Serialize;
use std::sync::Arc;

use super::text_generator::TextGenerator;
use crate::server::error::ServerError;

const PERSONA: &str =
    "You are an expert social media copywriter who writes high-converting posts.";
const DEFAULT_TONE: &str = "engaging";
const DEFAULT_PLATFORM: &str = "Instagram";

/// Result of rewriting a single caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RewriteOutcome {
    Rewritten { text: String },
    Failed { error: String },
}

impl RewriteOutcome {
    /// Display text for the caption slot; failures render as a placeholder.
    pub fn display_text(&self) -> String {
        match self {
            RewriteOutcome::Rewritten { text } => text.clone(),
            RewriteOutcome::Failed { error } => format!("Error rewriting caption: {}", error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteError {
    /// 1-based position in the submitted batch
    pub index: usize,
    pub caption: String,
    pub error: String,
}

/// Ordered outcomes, one per submitted caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteBatch {
    pub captions: Vec<String>,
    pub outcomes: Vec<RewriteOutcome>,
}

impl RewriteBatch {
    pub fn rewritten_captions(&self) -> Vec<String> {
        self.outcomes.iter().map(RewriteOutcome::display_text).collect()
    }

    pub fn errors(&self) -> Vec<RewriteError> {
        self.captions
            .iter()
            .zip(&self.outcomes)
            .enumerate()
            .filter_map(|(i, (caption, outcome))| match outcome {
                RewriteOutcome::Failed { error } => Some(RewriteError {
                    index: i + 1,
                    caption: caption.clone(),
                    error: error.clone(),
                }),
                RewriteOutcome::Rewritten { .. } => None,
            })
            .collect()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, RewriteOutcome::Failed { .. }))
            .count()
    }
}

pub fn build_prompt(caption: &str, tone: &str, platform: &str) -> String {
    format!(
        "Rewrite the following caption to match a high-converting {platform} post. \
         Use a {tone} voice. Include hashtags if helpful. Keep it under 200 words.\n\n\
         Caption: {caption}"
    )
}

pub struct CaptionRewriter {
    generator: Arc<dyn TextGenerator>,
}

impl CaptionRewriter {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Rewrite each caption in order. A failure is recorded against its
    /// caption and the batch carries on.
    pub async fn rewrite_all(
        &self,
        captions: Vec<String>,
        tone: Option<&str>,
        platform: Option<&str>,
    ) -> Result<RewriteBatch, ServerError> {
        if captions.is_empty() {
            return Err(ServerError::InvalidRequest(
                "captions must be a non-empty array".to_string(),
            ));
        }

        let tone = tone.filter(|t| !t.trim().is_empty()).unwrap_or(DEFAULT_TONE);
        let platform = platform
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_PLATFORM);

        let mut outcomes = Vec::with_capacity(captions.len());
        for (i, caption) in captions.iter().enumerate() {
            let prompt = build_prompt(caption, tone, platform);
            let outcome = match self.generator.generate(PERSONA, &prompt).await {
                Ok(text) => RewriteOutcome::Rewritten { text },
                Err(e) => {
                    let error = match e {
                        ServerError::Provider(detail) => detail,
                        other => other.to_string(),
                    };
                    tracing::warn!(index = i + 1, error = %error, "Caption rewrite failed");
                    RewriteOutcome::Failed { error }
                }
            };
            outcomes.push(outcome);
        }

        let batch = RewriteBatch { captions, outcomes };
        tracing::info!(
            total = batch.outcomes.len(),
            failed = batch.failed_count(),
            tone = %tone,
            platform = %platform,
            "Caption rewrite batch finished"
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Upper-cases the caption line of the prompt, failing on captions
    /// containing "fail".
    #[derive(Default)]
    struct ScriptedGenerator {
        prompts: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, system: &str, prompt: &str) -> Result<String, ServerError> {
            self.prompts
                .lock()
                .unwrap()
                .push((system.to_string(), prompt.to_string()));
            let caption = prompt.rsplit("Caption: ").next().unwrap_or_default();
            if caption.contains("fail") {
                return Err(ServerError::Provider("rate limited".to_string()));
            }
            Ok(caption.to_uppercase())
        }
    }

    fn captions(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn partial_failure_keeps_order_and_length() {
        let generator = Arc::new(ScriptedGenerator::default());
        let rewriter = CaptionRewriter::new(generator.clone());

        let batch = rewriter
            .rewrite_all(captions(&["one", "please fail", "three"]), None, None)
            .await
            .unwrap();

        assert_eq!(
            batch.rewritten_captions(),
            vec![
                "ONE".to_string(),
                "Error rewriting caption: rate limited".to_string(),
                "THREE".to_string(),
            ]
        );
        assert_eq!(
            batch.errors(),
            vec![RewriteError {
                index: 2,
                caption: "please fail".to_string(),
                error: "rate limited".to_string(),
            }]
        );
        assert_eq!(generator.prompts.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn all_failures_still_return_a_batch() {
        let rewriter = CaptionRewriter::new(Arc::new(ScriptedGenerator::default()));
        let batch = rewriter
            .rewrite_all(captions(&["fail a", "fail b"]), None, None)
            .await
            .unwrap();
        assert_eq!(batch.failed_count(), 2);
        assert_eq!(batch.errors().len(), 2);
    }

    #[tokio::test]
    async fn defaults_and_persona_are_used() {
        let generator = Arc::new(ScriptedGenerator::default());
        let rewriter = CaptionRewriter::new(generator.clone());
        rewriter
            .rewrite_all(captions(&["hello"]), Some(""), None)
            .await
            .unwrap();

        let prompts = generator.prompts.lock().unwrap();
        let (system, prompt) = &prompts[0];
        assert_eq!(system, PERSONA);
        assert_eq!(prompt, &build_prompt("hello", "engaging", "Instagram"));
        assert!(prompt.contains("high-converting Instagram post"));
        assert!(prompt.contains("Use a engaging voice"));
    }

    #[tokio::test]
    async fn custom_tone_and_platform() {
        let generator = Arc::new(ScriptedGenerator::default());
        let rewriter = CaptionRewriter::new(generator.clone());
        rewriter
            .rewrite_all(captions(&["hello"]), Some("playful"), Some("LinkedIn"))
            .await
            .unwrap();

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].1.contains("high-converting LinkedIn post"));
        assert!(prompts[0].1.contains("Use a playful voice"));
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let rewriter = CaptionRewriter::new(Arc::new(ScriptedGenerator::default()));
        let err = rewriter.rewrite_all(Vec::new(), None, None).await.unwrap_err();
        assert!(matches!(err, ServerError::InvalidRequest(_)));
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let value = serde_json::to_value(RewriteOutcome::Failed {
            error: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({"status": "failed", "error": "boom"}));
    }
}
