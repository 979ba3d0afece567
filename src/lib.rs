//! # Fragment Translator
//!
//! 翻译服务端渲染页面与 JSON 响应中内嵌的 JSON 数据，
//! 只改动人类可读的字符串叶子，结构与机器可读的值保持不变。
//!
//! ## 模块组织
//!
//! - `core` - 响应类型判断、字符集处理与终端输出
//! - `env` - 环境变量
//! - `parsers` - HTML 与脚本变量解析
//! - `translation` - 片段提取、标记编解码、回填与翻译服务

pub mod core;
pub mod env;
pub mod parsers;
pub mod translation;

// Re-export commonly used items for convenience
pub use self::core::{decode_body, encode_body, ResponseKind};
pub use translation::{FragmentService, TranslationConfig, TranslationError, TranslationResult};
