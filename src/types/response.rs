// src/types/response.rs
use serde::{Deserialize, Serialize};

// ===== Translation Payloads =====

/// The CV fields sent for translation, and the shape expected back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatableContent {
    pub title: String,
    pub bio: String,
    pub experience: String,
    pub education: String,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResult {
    pub cv_id: i64,
    pub target_language: String,
    pub translated_content: TranslatableContent,
}

// ===== Chat Completion Service Types =====

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}
