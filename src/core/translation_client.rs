// src/core/translation_client.rs
//! CV translation through an OpenAI-compatible chat completion endpoint

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::app_log;
use crate::core::config_manager::TranslationSettings;
use crate::types::response::{ChatCompletionResponse, TranslatableContent};
use crate::types::Cv;
use crate::utils::normalize_language_key;

const CHAT_COMPLETIONS_ENDPOINT: &str = "/v1/chat/completions";
const MAX_TOKENS: u32 = 2000;
const TEMPERATURE: f32 = 0.3;
const TRANSLATION_ERROR: &str = "Translation Error";

/// Language key -> display name with the native name
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("cornish", "Cornish (Kernewek)"),
    ("manx", "Manx (Gaelg)"),
    ("breton", "Breton (Brezhoneg)"),
    ("inuktitut", "Inuktitut (ᐃᓄᒃᑎᑐᑦ)"),
    ("kalaallisut", "Kalaallisut (Greenlandic)"),
    ("romani", "Romani (Rromani ćhib)"),
    ("occitan", "Occitan (Occità)"),
    ("ladino", "Ladino (Judeo-Spanish)"),
    ("northern_sami", "Northern Sami (Davvisámegiella)"),
    ("upper_sorbian", "Upper Sorbian (Hornjoserbšćina)"),
    ("kashubian", "Kashubian (Kaszëbsczi jãzëk)"),
    ("zazaki", "Zazaki (Kirmanjki)"),
    ("chuvash", "Chuvash (Чӑваш чӗлхи)"),
    ("livonian", "Livonian (Līvõ kēļ)"),
    ("tsakonian", "Tsakonian (Τσακώνικα)"),
    ("saramaccan", "Saramaccan"),
    ("bislama", "Bislama"),
];

pub fn language_name(key: &str) -> Option<&'static str> {
    let key = normalize_language_key(key);
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, name)| *name)
}

/// One system + user exchange with a language model
#[rocket::async_trait]
pub trait Translator: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

pub struct OpenAiTranslator {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiTranslator {
    pub fn new(settings: &TranslationSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        if settings.api_key.is_none() {
            app_log!(warn, "Translation API key not configured");
        }

        Ok(Self {
            client,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }
}

#[rocket::async_trait]
impl Translator for OpenAiTranslator {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Translation API key not configured"))?;

        let url = format!("{}{}", self.api_url, CHAT_COMPLETIONS_ENDPOINT);
        let payload = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
        });

        app_log!(trace, "Calling translation service: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .context("Failed to call translation service")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("Translation failed with status {}: {}", status, error_text);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse translation response")?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("Translation service returned no content"))
    }
}

pub struct TranslationService {
    translator: Arc<dyn Translator>,
}

impl TranslationService {
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self { translator }
    }

    pub fn supported_languages() -> &'static [(&'static str, &'static str)] {
        SUPPORTED_LANGUAGES
    }

    pub async fn translate(&self, cv: &Cv, target_language: &str) -> Result<TranslatableContent> {
        let language = language_name(target_language)
            .ok_or_else(|| anyhow::anyhow!("Language '{}' not supported", target_language))?;

        let content = translatable_content(cv);
        let prompt = translation_prompt(&content, language)?;
        let system = format!(
            "You are a professional translator specializing in translating CVs and professional \
             documents to {}. Maintain professional tone and accuracy.",
            language
        );

        let reply = self.translator.complete(&system, &prompt).await?;
        let translated = parse_translation_response(&reply)?;

        app_log!(info, "Translated CV {} to {}", cv.id, language);
        Ok(translated)
    }
}

pub fn translatable_content(cv: &Cv) -> TranslatableContent {
    TranslatableContent {
        title: cv.title.clone(),
        bio: cv.bio.clone(),
        experience: cv.experience.clone(),
        education: cv.education.clone(),
        skills: cv.skills.clone(),
    }
}

pub fn translation_prompt(content: &TranslatableContent, language: &str) -> Result<String> {
    let content_json =
        serde_json::to_string_pretty(content).context("Failed to serialize CV content")?;

    Ok(format!(
        "Please translate the following CV content to {language}.\n\
         Maintain professional terminology and preserve the structure.\n\
         Return the translation in the same JSON format:\n\n\
         {content_json}\n\n\
         Please respond with a JSON object containing the translated fields:\n\
         {{\n  \"title\": \"translated title\",\n  \"bio\": \"translated bio\",\n  \
         \"experience\": \"translated experience\",\n  \"education\": \"translated education\",\n  \
         \"skills\": [\"translated\", \"skill\", \"names\"]\n}}\n"
    ))
}

/// Parse the JSON object embedded in a model reply.
///
/// Everything between the first `{` and the last `}` is parsed; when that is
/// not valid JSON the reply is kept as the bio of an error placeholder.
pub fn parse_translation_response(reply: &str) -> Result<TranslatableContent> {
    let (Some(start), Some(end)) = (reply.find('{'), reply.rfind('}')) else {
        anyhow::bail!("Could not parse translation response");
    };
    if end <= start {
        anyhow::bail!("Could not parse translation response");
    }

    match serde_json::from_str::<TranslatableContent>(&reply[start..=end]) {
        Ok(content) => Ok(content),
        Err(e) => {
            app_log!(warn, "Translation reply is not valid JSON: {}", e);
            Ok(TranslatableContent {
                title: TRANSLATION_ERROR.to_string(),
                bio: reply.to_string(),
                experience: TRANSLATION_ERROR.to_string(),
                education: TRANSLATION_ERROR.to_string(),
                skills: vec![TRANSLATION_ERROR.to_string()],
            })
        }
    }
}
