use super::{ChatModel, ChatTurn};
use crate::db::models::chat::ChatRole;
use anyhow::anyhow;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::instrument;

pub struct OpenAiChat {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiChat {
    pub fn new(api_key: String, api_base: Option<String>, model: String) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(api_base) = api_base {
            config = config.with_api_base(api_base);
        }
        Self {
            client: Client::with_config(config),
            model,
        }
    }
}

fn request_messages(system_prompt: &str, history: &[ChatTurn]) -> anyhow::Result<Vec<ChatCompletionRequestMessage>> {
    let mut messages: Vec<ChatCompletionRequestMessage> =
        vec![ChatCompletionRequestSystemMessageArgs::default().content(system_prompt).build()?.into()];

    for turn in history {
        let message = match turn.role {
            ChatRole::User => ChatCompletionRequestUserMessageArgs::default()
                .content(turn.content.as_str())
                .build()?
                .into(),
            ChatRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(turn.content.as_str())
                .build()?
                .into(),
        };
        messages.push(message);
    }

    Ok(messages)
}

#[async_trait]
impl ChatModel for OpenAiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model, turns = history.len()), err)]
    async fn reply(&self, system_prompt: &str, history: &[ChatTurn]) -> anyhow::Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(request_messages(system_prompt, history)?)
            .build()?;

        let response = self.client.chat().create(request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| anyhow!("model {} returned an empty reply", self.model))
    }
}
