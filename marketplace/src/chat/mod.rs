//! Site assistant backed by a hosted language model.

pub mod openai;

use crate::{config::ChatConfig, db::models::chat::ChatRole};
use async_trait::async_trait;
use std::sync::Arc;

/// Messages of context sent along with each new question
pub const CONTEXT_MESSAGES: i64 = 10;

/// Stored and returned in place of a reply when the model call fails
pub const APOLOGY_MESSAGE: &str = "I'm sorry, I'm having trouble answering right now. Please try again in a moment, \
     or contact our support team if the problem continues.";

pub const SYSTEM_PROMPT: &str = "You are the assistant for a marketplace that connects customers who need a \
service with local professionals across Canada: contractors, plumbers, electricians, HVAC, roofing, landscaping, \
cleaning, handyman, painting and flooring trades, real estate agents and mortgage brokers.

Customers post service requests for free. Professionals sign up for free, create a business profile and buy \
lead credits; one credit unlocks the contact details of one request. Credits come in packages, from the Tester \
Pack (3 leads for $150) up to the Enterprise Deluxe pack (200 leads for $13,250). Leads go to a small number of \
professionals rather than being broadcast.

Help visitors sign up as a customer or a professional, explain how requests, leads and credit packages work, \
and answer billing and account questions. For account-specific problems, point people to the support team.

Keep answers short, friendly and practical.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier recorded with each reply
    fn model_name(&self) -> &str;

    /// Answer the last turn of `history`, which runs oldest first
    async fn reply(&self, system_prompt: &str, history: &[ChatTurn]) -> anyhow::Result<String>;
}

/// `None` when the assistant is disabled
pub fn model_from_config(config: &ChatConfig) -> Option<Arc<dyn ChatModel>> {
    if !config.enabled {
        return None;
    }
    let api_key = config.api_key.clone()?;
    Some(Arc::new(openai::OpenAiChat::new(api_key, config.api_base.clone(), config.model.clone())))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_or_keyless_means_no_model() {
        assert!(model_from_config(&ChatConfig::default()).is_none());

        let keyless = ChatConfig {
            enabled: true,
            ..Default::default()
        };
        assert!(model_from_config(&keyless).is_none());

        let configured = ChatConfig {
            enabled: true,
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let model = model_from_config(&configured).expect("Model should be configured");
        assert_eq!(model.model_name(), "gpt-4o");
    }
}
