//! 翻译模块
//!
//! 对服务端渲染页面和 JSON 响应中的内嵌 JSON 做往返翻译：
//! - **pipeline**: 路径匹配、规则判定、片段提取、标记编解码、回填
//! - **core**: 翻译服务与后端
//! - **config**: 配置管理
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use fragment_translator::translation::{FragmentService, HttpBackend, TranslationConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TranslationConfig::default_with_lang("fr", Some("http://localhost:1188/translate"));
//! let backend = HttpBackend::from_config(&config)?;
//! let service = FragmentService::new(config)?;
//!
//! let html = std::fs::read_to_string("page.html")?;
//! let outcome = service.translate_html(&html, "/fr/cart", &backend);
//! println!("{}", outcome.content);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// 子模块声明
// ============================================================================

/// 配置管理模块 - 语言、后端地址、规则与片段覆盖
pub mod config;

/// 核心模块 - 翻译服务与后端约定
pub mod core;

/// 错误处理模块 - 统一的错误类型和处理机制
pub mod error;

/// 片段处理管道模块
///
/// 负责路径匹配、规则判定、叶子提取、标记编解码与回填
pub mod pipeline;

// ============================================================================
// 核心API导出 - 主要的公共接口
// ============================================================================

/// 翻译服务的主要组件
pub use self::core::{
    BackendRequest, BackendResponse, FragmentService, HttpBackend, PipelineOutcome,
    PipelineState, ServiceStats, TranslationBackend,
};

/// 配置管理相关组件
pub use config::{constants, ConfigManager, IntegrationConfig, TranslationConfig};

/// 错误处理相关类型
pub use error::{ErrorCategory, ErrorSeverity, TranslationError, TranslationResult};

// ============================================================================
// 高级API导出 - 供高级用户和扩展开发使用
// ============================================================================

/// 片段处理管道组件
pub use pipeline::{
    Disposition, FragmentBundle, FragmentExtractor, KeyPath, LeafFilter, LeafFilterConfig,
    MarkerCodec, MatchMode, Rule, RuleSet, RuleSpec, TranslatedBundles, TranslatedMap,
};

// ============================================================================
// 便利函数导出
// ============================================================================

/// 通过 HTTP 后端翻译一个页面（同步版本）
///
/// 任何失败都会返回原始页面，不会返回错误；只有配置本身无效时返回 `Err`。
///
/// # Examples
///
/// ```rust,no_run
/// use fragment_translator::translation::translate_page;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let html = "<p>Hello</p>";
/// let translated = translate_page(html, "/", "zh", Some("http://localhost:1188/translate"))?;
/// # Ok(())
/// # }
/// ```
pub fn translate_page(
    html: &str,
    path_context: &str,
    target_lang: &str,
    api_url: Option<&str>,
) -> TranslationResult<String> {
    let config = TranslationConfig::default_with_lang(target_lang, api_url);
    let backend = HttpBackend::from_config(&config)?;
    let service = FragmentService::new(config)?;
    Ok(service.translate_html(html, path_context, &backend).content)
}

/// 检查文本是否应该翻译（便利函数）
///
/// 使用默认的叶子过滤配置。
///
/// # Examples
///
/// ```rust
/// use fragment_translator::translation::should_translate;
///
/// assert_eq!(should_translate("Hello World"), true);
/// assert_eq!(should_translate("123"), false);  // 纯数字
/// assert_eq!(should_translate(""), false);     // 空文本
/// assert_eq!(should_translate("   "), false);  // 纯空白
/// ```
pub fn should_translate(text: &str) -> bool {
    LeafFilter::default().should_translate(text)
}

/// 检查翻译配置文件是否存在
pub fn config_file_exists() -> bool {
    config::config_file_exists()
}

/// 加载翻译配置
pub fn load_translation_config(target_lang: &str, api_url: Option<&str>) -> TranslationConfig {
    config::load_translation_config(target_lang, api_url)
}
