//! 翻译配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{ConfigManager, IntegrationConfig, TranslationConfig};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    // 默认API设置
    pub const DEFAULT_API_URL: &str = "http://localhost:1188/translate";
    pub const DEFAULT_TARGET_LANG: &str = "zh";
    pub const DEFAULT_SOURCE_LANG: &str = "auto";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    // 叶子过滤
    pub const MAX_EMAIL_LENGTH: usize = 100;

    // 标记词汇
    pub const MARKER_ATTR: &str = "data-fragment";
    pub const MARKER_CONTAINER_ATTR: &str = "data-fragment-markers";
    pub const CARRIAGE_RETURN_ATTR: &str = "data-fragment-cr";
    pub const SYNTHETIC_DOCUMENT: &str = "<!DOCTYPE html><html><head></head><body></body></html>";

    // 脚本变量替换
    pub const JSON_PLACEHOLDER: &str = "%json%";
    pub const JSON_CAPTURE_GROUP: &str = "json";
    pub const REPEATED_NAME_SEPARATOR: char = '#';

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "fragment-translator.toml",
        "translation-config.toml",
        ".fragment-translator.toml",
        "~/.config/fragment-translator/config.toml",
        "/etc/fragment-translator/config.toml",
    ];

    pub const ENV_FILES: &[&str] = &[".env.local", ".env.development", ".env.production", ".env"];
}

/// 便利函数
pub fn config_file_exists() -> bool {
    constants::CONFIG_PATHS
        .iter()
        .any(|path| std::path::Path::new(shellexpand::tilde(path).as_ref()).exists())
}

/// 加载配置，失败时退回默认配置
pub fn load_translation_config(target_lang: &str, api_url: Option<&str>) -> TranslationConfig {
    match ConfigManager::new() {
        Ok(manager) => manager.create_simple_config(target_lang, api_url),
        Err(e) => {
            tracing::warn!("配置加载失败，使用默认配置: {}", e);
            TranslationConfig::default_with_lang(target_lang, api_url)
        }
    }
}
