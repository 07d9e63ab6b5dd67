use crate::endpoints::{chat::CreateChatCompletion, ChatMessage};

#[derive(Default)]
pub struct ChatRepository;

impl ChatRepository {
    pub fn new() -> Self {
        Self
    }

    pub fn create(&self, model: impl Into<String>) -> CreateChatCompletion {
        CreateChatCompletion::new(model)
    }

    /// A two-message completion: a system persona followed by one user prompt.
    pub fn prompt(
        &self,
        model: impl Into<String>,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> CreateChatCompletion {
        CreateChatCompletion::new(model)
            .message(ChatMessage::system(system))
            .message(ChatMessage::user(user))
    }
}
