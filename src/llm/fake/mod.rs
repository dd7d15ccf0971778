#[cfg(test)]
mod tests;

use crate::Result;
use crate::config::settings::DEBUG_MODEL;
use crate::llm::{ChatMessage, ChatModel, Role};

const SOURCE_PREFIX: &str = "Source:";
const CONTENT_PREFIX: &str = "Content:";
const ANSWER_PREVIEW_CHARS: usize = 200;

/// Offline chat model.
///
/// Replies with the first context passage of the last user message and
/// cites its source, in the same shape a real model is asked to use.
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeChat;

impl ChatModel for FakeChat {
    #[inline]
    fn model(&self) -> &str {
        DEBUG_MODEL
    }

    #[inline]
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map_or("", |m| m.content.as_str());

        let content = prompt
            .lines()
            .find_map(|line| line.trim().strip_prefix(CONTENT_PREFIX))
            .map(str::trim);
        let source = prompt
            .lines()
            .find_map(|line| line.trim().strip_prefix(SOURCE_PREFIX))
            .map(str::trim);

        let reply = match (content, source) {
            (Some(content), Some(source)) => {
                let preview: String = content.chars().take(ANSWER_PREVIEW_CHARS).collect();
                format!("{}\nSOURCES: {}", preview, source)
            }
            _ => "I don't know.\nSOURCES:".to_string(),
        };

        Ok(reply)
    }
}
