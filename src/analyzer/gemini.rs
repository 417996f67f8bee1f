//! Gemini API連携
//!
//! 画像をinline_dataとして送り、responseSchemaで構造化された請求書JSONを受け取る

use super::{InvoiceExtractor, EXTRACTION_FAILED_MESSAGE};
use crate::config::Config;
use crate::error::{InvoiceAiError, Result};
use crate::scanner::ImagePayload;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use invoice_ai_common::{
    build_extraction_prompt, invoice_response_schema, parse_invoice_response, InvoiceRecord,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Gemini APIリクエスト
#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: String,
    response_schema: serde_json::Value,
}

/// Gemini APIレスポンス
#[derive(Deserialize)]
struct GeminiResponse {
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
struct ResponsePart {
    text: Option<String>,
}

pub struct GeminiExtractor {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    home_currency: String,
}

impl GeminiExtractor {
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.get_api_key()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| InvoiceAiError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
            home_currency: config.home_currency.clone(),
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    async fn request_invoice(&self, pages: &[&ImagePayload]) -> anyhow::Result<InvoiceRecord> {
        let request = build_request(pages);
        debug!(model = %self.model, pages = pages.len(), "Gemini request");

        let response = self
            .http
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error {}: {}", status, body));
        }

        let payload: GeminiResponse = response.json().await.context("invalid Gemini response")?;
        let text = first_text(payload).ok_or_else(|| anyhow!("empty response from model"))?;
        let record = parse_invoice_response(&text)?;
        Ok(record)
    }
}

#[async_trait]
impl InvoiceExtractor for GeminiExtractor {
    async fn extract(&self, pages: &[&ImagePayload]) -> Result<InvoiceRecord> {
        if pages.is_empty() {
            return Err(InvoiceAiError::NoFiles);
        }

        match self.request_invoice(pages).await {
            Ok(record) => {
                info!(pages = pages.len(), items = record.items.len(), "invoice extracted");
                Ok(record.with_currency(&self.home_currency))
            }
            Err(cause) => {
                warn!(pages = pages.len(), error = %format!("{:#}", cause), "invoice extraction failed");
                Err(InvoiceAiError::Extraction(EXTRACTION_FAILED_MESSAGE.to_string()))
            }
        }
    }
}

/// 画像 → 指示文 の順でパートを組み立てる
fn build_request(pages: &[&ImagePayload]) -> GeminiRequest {
    let mut parts: Vec<Part> = pages
        .iter()
        .map(|page| Part::InlineData {
            inline_data: InlineData {
                mime_type: page.mime_type.clone(),
                data: STANDARD.encode(&page.data),
            },
        })
        .collect();
    parts.push(Part::Text {
        text: build_extraction_prompt(pages.len()),
    });

    GeminiRequest {
        contents: vec![Content { parts }],
        generation_config: GenerationConfig {
            temperature: 0.1,
            response_mime_type: "application/json".to_string(),
            response_schema: invoice_response_schema(),
        },
    }
}

fn first_text(response: GeminiResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
        .filter(|t| !t.trim().is_empty())
}
