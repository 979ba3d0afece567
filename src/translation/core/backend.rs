//! 翻译后端
//!
//! 后端接收一份完整的 HTML 文档（页面本身加上片段标记），返回翻译后的文档，
//! 或者返回一个跳转地址表示本次不翻译。任何实现 [`TranslationBackend`]
//! 的类型都可以接入，闭包也可以直接作为后端使用。

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::translation::config::TranslationConfig;
use crate::translation::error::{TranslationError, TranslationResult};

/// 发往后端的请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRequest {
    pub html_document: String,
    pub target_language: String,
    pub source_language: String,
    /// 页面路径，后端可以据此区分上下文
    pub path_context: String,
    pub timeout: Duration,
}

/// 后端应答
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendResponse {
    /// 翻译后的文档，标记完好
    Content(String),
    /// 后端要求跳转到其他地址，视为未翻译
    Redirect(String),
}

/// 翻译后端
pub trait TranslationBackend {
    fn translate(&self, request: &BackendRequest) -> TranslationResult<BackendResponse>;
}

impl<F> TranslationBackend for F
where
    F: Fn(&BackendRequest) -> TranslationResult<BackendResponse>,
{
    fn translate(&self, request: &BackendRequest) -> TranslationResult<BackendResponse> {
        self(request)
    }
}

/// HTTP 请求体
#[derive(Debug, Serialize)]
struct Payload<'a> {
    content: &'a str,
    target_language: &'a str,
    source_language: &'a str,
    path: &'a str,
}

/// HTTP 应答体：`{"content": ...}` 或 `{"redirect": ...}`
#[derive(Debug, Default, Deserialize)]
struct Reply {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    redirect: Option<String>,
}

impl Reply {
    fn into_response(self) -> TranslationResult<BackendResponse> {
        match (self.redirect, self.content) {
            (Some(url), _) => Ok(BackendResponse::Redirect(url)),
            (None, Some(content)) => Ok(BackendResponse::Content(content)),
            (None, None) => Err(TranslationError::BackendUnavailable(
                "应答中既没有 content 也没有 redirect".to_string(),
            )),
        }
    }
}

/// 基于 reqwest 阻塞客户端的 HTTP 后端
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::blocking::Client,
    api_url: String,
    api_key: Option<String>,
}

impl HttpBackend {
    pub fn new(api_url: impl Into<String>, api_key: Option<String>) -> TranslationResult<Self> {
        let api_url = api_url.into();
        url::Url::parse(&api_url).map_err(|e| {
            TranslationError::ConfigError(format!("API URL 无效 '{}': {}", api_url, e))
        })?;

        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TranslationError::ConfigError(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self {
            client,
            api_url,
            api_key,
        })
    }

    pub fn from_config(config: &TranslationConfig) -> TranslationResult<Self> {
        Self::new(config.api_url.clone(), config.api_key.clone())
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

impl TranslationBackend for HttpBackend {
    fn translate(&self, request: &BackendRequest) -> TranslationResult<BackendResponse> {
        let payload = Payload {
            content: &request.html_document,
            target_language: &request.target_language,
            source_language: &request.source_language,
            path: &request.path_context,
        };

        tracing::debug!(
            "请求翻译后端 {} ({} 字节, 目标语言 {})",
            self.api_url,
            request.html_document.len(),
            request.target_language
        );

        let mut builder = self
            .client
            .post(&self.api_url)
            .timeout(request.timeout)
            .json(&payload);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(TranslationError::BackendUnavailable(format!(
                "翻译后端返回状态码 {}",
                status
            )));
        }

        let reply: Reply = response
            .json()
            .map_err(|e| TranslationError::BackendUnavailable(format!("应答无法解析: {}", e)))?;
        reply.into_response()
    }
}
