//! 翻译管道统一错误处理
//!
//! 错误按最小单位收敛：单个叶子、单个脚本变量、单个片段包，
//! 任何一个单位失败都不会中断同一页面上其他内容的翻译。

use std::fmt;

use thiserror::Error;

/// 翻译错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// 脚本变量或响应体不是合法 JSON，仅跳过该变量
    #[error("JSON 无效 ({name}): {message}")]
    InvalidJson { name: String, message: String },

    /// 规则中的正则表达式无法编译，仅拒绝该条规则
    #[error("规则模式错误 '{pattern}': {message}")]
    PatternError { pattern: String, message: String },

    /// 翻译后端不可用（网络、状态码、应答格式）
    #[error("翻译后端不可用: {0}")]
    BackendUnavailable(String),

    /// 翻译后端超时
    #[error("翻译后端超时: {0}")]
    BackendTimeout(String),

    /// 翻译后端要求跳转，视为未翻译
    #[error("翻译后端返回跳转: {0}")]
    BackendRedirect(String),

    /// 译文中缺少预期的片段标记
    #[error("片段标记缺失 ({name}): 期望 {expected} 个，实际 {found} 个")]
    MarkerDecodeMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    /// 译文无法与原始叶子位置对齐
    #[error("结构不匹配 ({name}): 路径 '{path}'")]
    StructuralMismatch { name: String, path: String },

    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl TranslationError {
    /// 错误是否已被收敛在局部单位内，可以继续处理其他内容
    pub fn is_recoverable(&self) -> bool {
        match self {
            TranslationError::InvalidJson { .. } => true,
            TranslationError::PatternError { .. } => true,
            TranslationError::BackendUnavailable(_) => true,
            TranslationError::BackendTimeout(_) => true,
            TranslationError::BackendRedirect(_) => true,
            TranslationError::MarkerDecodeMismatch { .. } => true,
            TranslationError::StructuralMismatch { .. } => true,
            TranslationError::ConfigError(_) => false,
            TranslationError::ParseError(_) => false,
            TranslationError::SerializationError(_) => true,
            TranslationError::InternalError(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslationError::InvalidJson { .. } => ErrorSeverity::Warning,
            TranslationError::PatternError { .. } => ErrorSeverity::Warning,
            TranslationError::BackendUnavailable(_) => ErrorSeverity::Error,
            TranslationError::BackendTimeout(_) => ErrorSeverity::Warning,
            TranslationError::BackendRedirect(_) => ErrorSeverity::Info,
            TranslationError::MarkerDecodeMismatch { .. } => ErrorSeverity::Error,
            TranslationError::StructuralMismatch { .. } => ErrorSeverity::Warning,
            TranslationError::ConfigError(_) => ErrorSeverity::Critical,
            TranslationError::ParseError(_) => ErrorSeverity::Error,
            TranslationError::SerializationError(_) => ErrorSeverity::Error,
            TranslationError::InternalError(_) => ErrorSeverity::Critical,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslationError::InvalidJson { .. } => ErrorCategory::Input,
            TranslationError::PatternError { .. } => ErrorCategory::Configuration,
            TranslationError::BackendUnavailable(_) => ErrorCategory::Backend,
            TranslationError::BackendTimeout(_) => ErrorCategory::Timeout,
            TranslationError::BackendRedirect(_) => ErrorCategory::Backend,
            TranslationError::MarkerDecodeMismatch { .. } => ErrorCategory::Markers,
            TranslationError::StructuralMismatch { .. } => ErrorCategory::Reassembly,
            TranslationError::ConfigError(_) => ErrorCategory::Configuration,
            TranslationError::ParseError(_) => ErrorCategory::Parsing,
            TranslationError::SerializationError(_) => ErrorCategory::Serialization,
            TranslationError::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// 后端相关错误，触发整页回退
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            TranslationError::BackendUnavailable(_)
                | TranslationError::BackendTimeout(_)
                | TranslationError::BackendRedirect(_)
        )
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(self, context: T) -> Self {
        let append = |msg: String| format!("{} (上下文: {})", msg, context);

        match self {
            TranslationError::BackendUnavailable(msg) => {
                TranslationError::BackendUnavailable(append(msg))
            }
            TranslationError::BackendTimeout(msg) => TranslationError::BackendTimeout(append(msg)),
            TranslationError::BackendRedirect(msg) => TranslationError::BackendRedirect(append(msg)),
            TranslationError::ConfigError(msg) => TranslationError::ConfigError(append(msg)),
            TranslationError::ParseError(msg) => TranslationError::ParseError(append(msg)),
            TranslationError::SerializationError(msg) => {
                TranslationError::SerializationError(append(msg))
            }
            TranslationError::InternalError(msg) => TranslationError::InternalError(append(msg)),
            TranslationError::InvalidJson { name, message } => TranslationError::InvalidJson {
                name,
                message: append(message),
            },
            TranslationError::PatternError { pattern, message } => {
                TranslationError::PatternError {
                    pattern,
                    message: append(message),
                }
            }
            // 结构化变体本身已经携带定位信息
            other => other,
        }
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Backend,
    Timeout,
    Markers,
    Reassembly,
    Parsing,
    Serialization,
    Internal,
}

impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::InternalError(format!("IO错误: {}", error))
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::SerializationError(format!("JSON序列化错误: {}", error))
    }
}

impl From<toml::de::Error> for TranslationError {
    fn from(error: toml::de::Error) -> Self {
        TranslationError::ParseError(format!("TOML解析错误: {}", error))
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TranslationError::BackendTimeout(error.to_string())
        } else {
            TranslationError::BackendUnavailable(error.to_string())
        }
    }
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误，并原样返回，便于在收敛点继续使用
    pub fn log_error(error: TranslationError) -> TranslationError {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("翻译信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("翻译警告: {}", error),
            ErrorSeverity::Error => tracing::error!("翻译错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("翻译严重错误: {}", error),
        }

        error
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::ConfigError(msg.to_string())
    }

    /// 创建 JSON 无效错误
    pub fn invalid_json<T: fmt::Display>(name: &str, msg: T) -> TranslationError {
        TranslationError::InvalidJson {
            name: name.to_string(),
            message: msg.to_string(),
        }
    }

    /// 创建后端不可用错误
    pub fn backend_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::BackendUnavailable(msg.to_string())
    }
}
