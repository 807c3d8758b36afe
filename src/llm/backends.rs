//! 基于 reqwest 的聊天补全后端

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::error::ProviderError;
use crate::llm::api::*;
use crate::llm::provider::{
    ChatBackend, ChatRequest, ProviderConfig, ProviderKind, RawCompletion, TokenUsage,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// 根据配置构建对应提供方的后端
pub fn build_backend(config: &ProviderConfig) -> Arc<dyn ChatBackend> {
    let client = http_client();
    let base_url = config.base_url().trim_end_matches('/').to_string();
    let api_key = config.api_key.clone();

    match config.provider {
        ProviderKind::OpenAi => Arc::new(OpenAiBackend { client, base_url, api_key }),
        ProviderKind::Anthropic => Arc::new(AnthropicBackend { client, base_url, api_key }),
        ProviderKind::Gemini => Arc::new(GeminiBackend { client, base_url, api_key }),
    }
}

fn http_client() -> Client {
    // 整体超时由适配器控制，这里只限制建连时间
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("marklens/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("构建 HTTP 客户端失败，使用默认配置: {}", e);
            Client::new()
        })
}

/// 发送请求并解析 JSON 响应；非 2xx 响应转为 `ProviderError::Api`
async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::Network(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::Network(e.to_string()))?;

    if !status.is_success() {
        let message = match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(parsed) => parsed.error.message,
            Err(_) => body,
        };
        return Err(ProviderError::Api {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body)
        .map_err(|e| ProviderError::Parse(format!("failed to parse response: {}", e)))
}

/// OpenAI chat completions
pub struct OpenAiBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<RawCompletion, ProviderError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        tracing::debug!("OpenAI chat: model={}", request.model);

        let body = OpenAiRequest {
            model: &request.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response: OpenAiResponse =
            send_json(self.client.post(&url).bearer_auth(&self.api_key).json(&body)).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(RawCompletion {
            content,
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model: response.model,
        })
    }
}

/// Anthropic messages
pub struct AnthropicBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

#[async_trait]
impl ChatBackend for AnthropicBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<RawCompletion, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        tracing::debug!("Anthropic chat: model={}", request.model);

        let body = AnthropicRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response: AnthropicResponse = send_json(
            self.client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body),
        )
        .await?;

        let content = response
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(RawCompletion {
            content,
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.input_tokens + u.output_tokens,
            }),
            model: response.model,
        })
    }
}

/// Gemini generateContent
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<RawCompletion, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, request.model
        );
        tracing::debug!("Gemini generate_content: model={}", request.model);

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart {
                    text: &request.prompt,
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };

        let response: GeminiResponse = send_json(
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body),
        )
        .await?;

        let content = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(RawCompletion {
            content,
            usage: response.usage_metadata.map(|u| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            }),
            model: response.model_version,
        })
    }
}
