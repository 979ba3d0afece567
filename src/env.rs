//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问，所有变量以 `FRAGMENT_` 为前缀

use std::env;
use std::fmt;
use std::time::Duration;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }

    /// 变量被显式设置时才返回值
    fn get_if_set() -> EnvResult<Option<T>> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value).map(Some),
            Err(_) => Ok(None),
        }
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "FRAGMENT_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("warn".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.trim().to_lowercase().as_str() {
                level @ ("trace" | "debug" | "info" | "warn" | "error") => Ok(level.to_string()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!("Invalid log level '{}'. Use: trace, debug, info, warn, error", value),
                }),
            }
        }
    }

    /// 禁用颜色输出
    pub struct NoColor;
    impl EnvVar<bool> for NoColor {
        const NAME: &'static str = "NO_COLOR";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Disable colored output when set to any value";

        fn parse(value: &str) -> EnvResult<bool> {
            // NO_COLOR 遵循标准：任何值都表示禁用颜色
            Ok(!value.is_empty())
        }
    }
}

/// 翻译相关环境变量
pub mod translation {
    use super::*;

    /// 翻译功能启用状态
    pub struct Enabled;
    impl EnvVar<bool> for Enabled {
        const NAME: &'static str = "FRAGMENT_TRANSLATION_ENABLED";
        const DEFAULT: Option<bool> = Some(true);
        const DESCRIPTION: &'static str = "Enable translation; when disabled content passes through unchanged";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// 目标语言
    pub struct TargetLang;
    impl EnvVar<String> for TargetLang {
        const NAME: &'static str = "FRAGMENT_TARGET_LANG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Target language code (e.g. fr, de, pt-BR)";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(crate::translation::config::constants::DEFAULT_TARGET_LANG.to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            parse_language(value, Self::NAME, false)
        }
    }

    /// 源语言
    pub struct SourceLang;
    impl EnvVar<String> for SourceLang {
        const NAME: &'static str = "FRAGMENT_SOURCE_LANG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Source language code ('auto' for detection)";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(crate::translation::config::constants::DEFAULT_SOURCE_LANG.to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            parse_language(value, Self::NAME, true)
        }
    }

    /// API URL
    pub struct ApiUrl;
    impl EnvVar<String> for ApiUrl {
        const NAME: &'static str = "FRAGMENT_API_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Translation backend endpoint URL";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(crate::translation::config::constants::DEFAULT_API_URL.to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim();
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(url.to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "API URL must start with http:// or https://".to_string(),
                })
            }
        }
    }

    /// API 密钥
    pub struct ApiKey;
    impl EnvVar<String> for ApiKey {
        const NAME: &'static str = "FRAGMENT_API_KEY";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Bearer token sent to the translation backend";

        fn parse(value: &str) -> EnvResult<String> {
            let key = value.trim();
            if key.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "API key cannot be empty".to_string(),
                });
            }
            Ok(key.to_string())
        }
    }

    /// 后端请求超时
    pub struct Timeout;
    impl EnvVar<Duration> for Timeout {
        const NAME: &'static str = "FRAGMENT_TIMEOUT";
        const DEFAULT: Option<Duration> = Some(Duration::from_secs(30));
        const DESCRIPTION: &'static str = "Translation backend timeout in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let seconds: u64 = value.trim().parse().map_err(|_| EnvError {
                variable: Self::NAME.to_string(),
                message: "Must be a valid number of seconds".to_string(),
            })?;

            if seconds == 0 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Timeout must be greater than 0".to_string(),
                });
            }

            if seconds > 300 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Timeout too long (max 300 seconds)".to_string(),
                });
            }

            Ok(Duration::from_secs(seconds))
        }
    }
}

/// 辅助函数
fn parse_bool(value: &str, var_name: &str) -> EnvResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "enabled" => Ok(true),
        "false" | "0" | "no" | "off" | "disabled" => Ok(false),
        _ => Err(EnvError {
            variable: var_name.to_string(),
            message: format!(
                "Invalid boolean value '{}'. Use: true/false, 1/0, yes/no, on/off, enabled/disabled",
                value
            ),
        }),
    }
}

fn parse_language(value: &str, var_name: &str, allow_auto: bool) -> EnvResult<String> {
    let lang = value.trim();
    if allow_auto && lang.eq_ignore_ascii_case("auto") {
        return Ok("auto".to_string());
    }

    let valid = (2..=8).contains(&lang.len())
        && lang.chars().all(|c| c.is_ascii_alphabetic() || c == '-' || c == '_')
        && lang.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    if !valid {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Invalid language code '{}'", value),
        });
    }
    Ok(lang.to_string())
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables Documentation\n\n");

    // 核心变量
    docs.push_str("## Core Configuration\n\n");
    docs.push_str(&format!("- `{}`: {} (default: {:?})\n",
        core::LogLevel::NAME, core::LogLevel::DESCRIPTION, core::LogLevel::DEFAULT));
    docs.push_str(&format!("- `{}`: {} (default: {:?})\n",
        core::NoColor::NAME, core::NoColor::DESCRIPTION, core::NoColor::DEFAULT));

    // 翻译变量
    docs.push_str("\n## Translation Configuration\n\n");
    docs.push_str(&format!("- `{}`: {} (default: {:?})\n",
        translation::Enabled::NAME, translation::Enabled::DESCRIPTION, translation::Enabled::DEFAULT));
    docs.push_str(&format!("- `{}`: {} (default: {:?})\n",
        translation::TargetLang::NAME, translation::TargetLang::DESCRIPTION, translation::TargetLang::DEFAULT));
    docs.push_str(&format!("- `{}`: {} (default: {:?})\n",
        translation::SourceLang::NAME, translation::SourceLang::DESCRIPTION, translation::SourceLang::DEFAULT));
    docs.push_str(&format!("- `{}`: {} (default: {:?})\n",
        translation::ApiUrl::NAME, translation::ApiUrl::DESCRIPTION, translation::ApiUrl::DEFAULT));
    docs.push_str(&format!("- `{}`: {} (default: {:?})\n",
        translation::ApiKey::NAME, translation::ApiKey::DESCRIPTION, translation::ApiKey::DEFAULT));
    docs.push_str(&format!("- `{}`: {} (default: {:?})\n",
        translation::Timeout::NAME, translation::Timeout::DESCRIPTION, translation::Timeout::DEFAULT));

    docs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(core::LogLevel::parse("DEBUG").unwrap(), "debug");
        assert_eq!(core::LogLevel::parse(" warn ").unwrap(), "warn");
        assert!(core::LogLevel::parse("verbose").is_err());
    }

    #[test]
    fn test_boolean_parsing() {
        // 测试各种布尔值格式
        assert!(translation::Enabled::parse("true").unwrap());
        assert!(translation::Enabled::parse("1").unwrap());
        assert!(translation::Enabled::parse("YES").unwrap());
        assert!(translation::Enabled::parse("on").unwrap());

        assert!(!translation::Enabled::parse("false").unwrap());
        assert!(!translation::Enabled::parse("0").unwrap());
        assert!(!translation::Enabled::parse("NO").unwrap());
        assert!(!translation::Enabled::parse("off").unwrap());

        // 测试无效值
        assert!(translation::Enabled::parse("maybe").is_err());
    }

    #[test]
    fn test_language_validation() {
        assert_eq!(translation::TargetLang::parse("fr").unwrap(), "fr");
        assert_eq!(translation::TargetLang::parse("pt-BR").unwrap(), "pt-BR");
        assert!(translation::TargetLang::parse("auto").is_ok());
        assert!(translation::TargetLang::parse("x").is_err());
        assert!(translation::TargetLang::parse("fr fr").is_err());

        assert_eq!(translation::SourceLang::parse("AUTO").unwrap(), "auto");
        assert!(translation::SourceLang::parse("").is_err());
    }

    #[test]
    fn test_url_validation() {
        assert!(translation::ApiUrl::parse("http://localhost:1188").is_ok());
        assert!(translation::ApiUrl::parse("https://api.example.com").is_ok());

        assert!(translation::ApiUrl::parse("ftp://example.com").is_err());
        assert!(translation::ApiUrl::parse("not-a-url").is_err());
    }

    #[test]
    fn test_timeout_validation() {
        assert_eq!(translation::Timeout::parse("5").unwrap(), Duration::from_secs(5));
        assert!(translation::Timeout::parse("0").is_err());
        assert!(translation::Timeout::parse("1000").is_err());
        assert!(translation::Timeout::parse("soon").is_err());
    }

    #[test]
    fn test_api_key_is_optional() {
        // 只读检查：未设置时 get_if_set 返回 None，get 返回错误
        if env::var_os(translation::ApiKey::NAME).is_none() {
            assert!(translation::ApiKey::get_if_set().unwrap().is_none());
            assert!(translation::ApiKey::get().is_err());
        }
        assert!(translation::ApiKey::parse("  ").is_err());
    }

    #[test]
    fn test_env_docs_list_all_variables() {
        let docs = generate_env_docs();
        for name in [
            core::LogLevel::NAME,
            core::NoColor::NAME,
            translation::Enabled::NAME,
            translation::TargetLang::NAME,
            translation::SourceLang::NAME,
            translation::ApiUrl::NAME,
            translation::ApiKey::NAME,
            translation::Timeout::NAME,
        ] {
            assert!(docs.contains(name), "missing {}", name);
        }
    }
}
