use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::Settings;
use crate::models::disease::DiseaseReport;
use crate::services::prompt;
use crate::utils::error::ApiError;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Client for the hosted generative model: chat completion, prompt-based
/// speech synthesis and image classification. One shared HTTP client with a
/// bounded timeout; no automatic retries.
#[derive(Clone)]
pub struct GeminiService {
    client: Client,
    api_key: String,
    chat_model: String,
    vision_model: String,
}

// ===== Wire format (camelCase on the wire) =====

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    safety_settings: Vec<SafetySetting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<Blob>,
}

impl Part {
    fn text(value: impl Into<String>) -> Self {
        Self {
            text: Some(value.into()),
            inline_data: None,
        }
    }

    fn inline_data(mime_type: impl Into<String>, data: &[u8]) -> Self {
        Self {
            text: None,
            inline_data: Some(Blob {
                mime_type: mime_type.into(),
                data: BASE64.encode(data),
            }),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct SafetySetting {
    category: String,
    threshold: String,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<ResponseBlob>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseBlob {
    mime_type: String,
    data: String,
}

impl GenerateContentResponse {
    /// First text part of the first candidate, if the model produced one.
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|content| content.parts.iter().find_map(|p| p.text.as_deref()))
    }

    fn first_audio(&self) -> Option<&ResponseBlob> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|content| {
                content.parts.iter().find_map(|p| {
                    p.inline_data
                        .as_ref()
                        .filter(|blob| blob.mime_type.starts_with("audio/"))
                })
            })
    }
}

fn default_safety_settings() -> Vec<SafetySetting> {
    [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ]
    .iter()
    .map(|category| SafetySetting {
        category: category.to_string(),
        threshold: "BLOCK_MEDIUM_AND_ABOVE".to_string(),
    })
    .collect()
}

/// Model output sometimes arrives wrapped in markdown fences despite the
/// instructions; strip them before parsing.
fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

impl GeminiService {
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(settings.gemini_timeout_seconds))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key: settings.gemini_api_key.clone(),
            chat_model: settings.gemini_model.clone(),
            vision_model: settings.gemini_vision_model.clone(),
        }
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ApiError> {
        let url = format!("{}/models/{}:generateContent", API_BASE, model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::Generation(format!("Gemini network error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Generation(format!(
                "Gemini API error ({}): {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Generation(format!("Failed to parse Gemini response: {}", e)))
    }

    /// Chat completion for a fully assembled prompt. Fails when the
    /// provider returns no candidate text (e.g. a safety block).
    pub async fn complete_chat(&self, prompt: &str) -> Result<String, ApiError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part::text(prompt)],
            }],
            safety_settings: default_safety_settings(),
            generation_config: Some(GenerationConfig {
                temperature: Some(0.7),
                ..Default::default()
            }),
        };

        debug!("Sending chat completion to model {}", self.chat_model);
        let body = self.generate(&self.chat_model, &request).await?;

        body.first_text()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| {
                ApiError::Generation("Model returned no candidates (response may have been blocked)".to_string())
            })
    }

    /// Prompt-based speech synthesis; returns WAV bytes.
    pub async fn synthesize_speech(
        &self,
        text: &str,
        language: &str,
    ) -> Result<Vec<u8>, ApiError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part::text(prompt::build_tts_prompt(text, language))],
            }],
            safety_settings: Vec::new(),
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("audio/wav".to_string()),
                ..Default::default()
            }),
        };

        debug!("Sending speech synthesis to model {}", self.chat_model);
        let body = self.generate(&self.chat_model, &request).await?;

        let blob = body.first_audio().ok_or_else(|| {
            ApiError::Generation("Model returned no audio data".to_string())
        })?;

        BASE64
            .decode(&blob.data)
            .map_err(|e| ApiError::Parse(format!("Invalid audio payload: {}", e)))
    }

    /// Classify a plant image into a structured disease report.
    pub async fn classify_image(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<DiseaseReport, ApiError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::text(prompt::CLASSIFIER_SYSTEM_PROMPT),
                    Part::inline_data(mime_type, image),
                ],
            }],
            safety_settings: Vec::new(),
            generation_config: None,
        };

        debug!("Sending image ({} bytes) to model {}", image.len(), self.vision_model);
        let body = self.generate(&self.vision_model, &request).await?;

        let text = body.first_text().ok_or_else(|| {
            ApiError::Generation("Model returned no candidates for the image".to_string())
        })?;

        let cleaned = strip_code_fences(text);
        serde_json::from_str(&cleaned)
            .map_err(|e| ApiError::Parse(format!("Error parsing the AI's response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_text_extraction() {
        let raw = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "  hello farmer  "}], "role": "model"}}
            ]
        }"#;
        let body: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(body.first_text(), Some("  hello farmer  "));
    }

    #[test]
    fn test_blocked_response_has_no_text() {
        // safety blocks arrive as a candidate-free body
        let body: GenerateContentResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(body.first_text().is_none());

        let body: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(body.first_text().is_none());
    }

    #[test]
    fn test_audio_part_extraction() {
        let raw = r#"{
            "candidates": [
                {"content": {"parts": [
                    {"inlineData": {"mimeType": "audio/wav", "data": "UklGRg=="}}
                ]}}
            ]
        }"#;
        let body: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let blob = body.first_audio().unwrap();
        assert_eq!(blob.mime_type, "audio/wav");
        assert_eq!(BASE64.decode(&blob.data).unwrap(), b"RIFF");
    }

    #[test]
    fn test_fenced_report_parses() {
        let raw = "```json\n{\"disease_name\": \"Leaf Blight\", \"precautions\": [\"avoid overhead watering\"], \"remedies\": [], \"medicines\": [{\"name\": \"Mancozeb\", \"mixing_ratio\": \"2g per liter\"}]}\n```";
        let cleaned = strip_code_fences(raw);
        let report: DiseaseReport = serde_json::from_str(&cleaned).unwrap();
        assert_eq!(report.disease_name, "Leaf Blight");
        assert_eq!(report.medicines[0].name, "Mancozeb");
    }

    #[test]
    fn test_malformed_report_is_rejected() {
        let cleaned = strip_code_fences("The plant looks healthy to me!");
        assert!(serde_json::from_str::<DiseaseReport>(&cleaned).is_err());
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part::text("hi"), Part::inline_data("image/png", b"abc")],
            }],
            safety_settings: default_safety_settings(),
            generation_config: Some(GenerationConfig {
                temperature: Some(0.7),
                response_mime_type: Some("audio/wav".to_string()),
            }),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("safetySettings").is_some());
        assert_eq!(
            json["generationConfig"]["responseMimeType"],
            serde_json::json!("audio/wav")
        );
        assert_eq!(
            json["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            serde_json::json!("image/png")
        );
    }
}
