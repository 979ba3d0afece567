//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::env::EnvVar;
use crate::parsers::js::FragmentOverride;
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::filters::LeafFilterConfig;
use crate::translation::pipeline::matcher::Disposition;
use crate::translation::pipeline::rules::{RuleSet, RuleSetBuilder, RuleSpec};

/// 一个集成贡献的规则与片段覆盖
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IntegrationConfig {
    pub name: String,
    pub rules: Vec<RuleSpec>,
    pub fragments: Vec<FragmentOverride>,
    /// 该集成片段使用的叶子过滤配置，缺省时沿用全局配置
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<LeafFilterConfig>,
}

/// 翻译配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslationConfig {
    // 基础配置
    pub enabled: bool,
    pub target_lang: String,
    pub source_lang: String,
    pub api_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_secs: u64,

    // 规则配置
    pub default_disposition: Disposition,
    pub filter: LeafFilterConfig,
    pub integrations: Vec<IntegrationConfig>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_lang: constants::DEFAULT_TARGET_LANG.to_string(),
            source_lang: constants::DEFAULT_SOURCE_LANG.to_string(),
            api_url: constants::DEFAULT_API_URL.to_string(),
            api_key: None,
            timeout_secs: constants::DEFAULT_TIMEOUT.as_secs(),

            default_disposition: Disposition::Allow,
            filter: LeafFilterConfig::default(),
            integrations: Vec::new(),
        }
    }
}

impl TranslationConfig {
    /// 创建带指定语言的默认配置
    pub fn default_with_lang(target_lang: &str, api_url: Option<&str>) -> Self {
        let mut config = Self {
            target_lang: target_lang.to_string(),
            ..Self::default()
        };
        if let Some(url) = api_url {
            config.api_url = url.to_string();
        }
        config
    }

    /// 验证配置
    pub fn validate(&self) -> TranslationResult<()> {
        if self.target_lang.trim().is_empty() {
            return Err(TranslationError::ConfigError("目标语言不能为空".to_string()));
        }

        if self.source_lang.trim().is_empty() {
            return Err(TranslationError::ConfigError("源语言不能为空".to_string()));
        }

        if self.timeout_secs == 0 {
            return Err(TranslationError::ConfigError("超时时间必须大于0".to_string()));
        }

        if self.enabled {
            url::Url::parse(&self.api_url).map_err(|e| {
                TranslationError::ConfigError(format!("API URL 无效 '{}': {}", self.api_url, e))
            })?;
        }

        for integration in &self.integrations {
            if integration.name.trim().is_empty() {
                return Err(TranslationError::ConfigError("集成名称不能为空".to_string()));
            }
            if let Some(fragment) = integration.fragments.iter().find(|f| f.name.trim().is_empty()) {
                return Err(TranslationError::ConfigError(format!(
                    "集成 '{}' 的片段覆盖缺少名称: {:?}",
                    integration.name, fragment
                )));
            }
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        use crate::env::translation;

        if let Some(enabled) = env_override::<_, translation::Enabled>() {
            self.enabled = enabled;
        }

        if let Some(target_lang) = env_override::<_, translation::TargetLang>() {
            self.target_lang = target_lang;
        }

        if let Some(source_lang) = env_override::<_, translation::SourceLang>() {
            self.source_lang = source_lang;
        }

        if let Some(api_url) = env_override::<_, translation::ApiUrl>() {
            self.api_url = api_url;
            tracing::info!("环境变量覆盖 API URL: {}", self.api_url);
        }

        if let Some(api_key) = env_override::<_, translation::ApiKey>() {
            self.api_key = Some(api_key);
        }

        if let Some(timeout) = env_override::<_, translation::Timeout>() {
            self.timeout_secs = timeout.as_secs().max(1);
        }
    }

    /// 转换为Duration类型
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// 按声明顺序组合所有集成的规则
    pub fn build_rules(&self) -> (RuleSet, Vec<TranslationError>) {
        let mut builder = RuleSetBuilder::new();
        for integration in &self.integrations {
            builder.add_specs(&integration.name, &integration.rules);
        }
        builder.finish()
    }

    /// 所有集成的片段覆盖，附带各自的过滤配置
    pub fn fragment_overrides(&self) -> impl Iterator<Item = (&FragmentOverride, &LeafFilterConfig)> {
        self.integrations.iter().flat_map(move |integration| {
            let filter = integration.filter.as_ref().unwrap_or(&self.filter);
            integration.fragments.iter().map(move |fragment| (fragment, filter))
        })
    }
}

/// 只在环境变量被显式设置时返回覆盖值，解析失败时记录警告
fn env_override<T, V: EnvVar<T>>() -> Option<T> {
    match V::get_if_set() {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("忽略环境变量: {}", e);
            None
        }
    }
}

/// 简化的配置管理器
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: TranslationConfig,
}

impl ConfigManager {
    /// 创建新的配置管理器
    pub fn new() -> TranslationResult<Self> {
        let config = Self::load_config()?;
        Self::from_config(config)
    }

    /// 从指定文件创建
    pub fn from_path(path: &str) -> TranslationResult<Self> {
        Self::load_dotenv();
        let expanded = shellexpand::tilde(path);
        let config = Self::load_from_file(&expanded)?;
        Self::from_config(config)
    }

    /// 从已有配置创建，应用环境变量覆盖并验证
    pub fn from_config(mut config: TranslationConfig) -> TranslationResult<Self> {
        config.apply_env_overrides();
        config.validate()?;
        Ok(Self { config })
    }

    /// 获取配置
    pub fn get_config(&self) -> &TranslationConfig {
        &self.config
    }

    pub fn into_config(self) -> TranslationConfig {
        self.config
    }

    /// 组合规则集，被拒绝的规则已记录日志
    pub fn build_rules(&self) -> RuleSet {
        let (rules, rejected) = self.config.build_rules();
        if !rejected.is_empty() {
            tracing::warn!("{} 条规则因模式错误被跳过", rejected.len());
        }
        rules
    }

    /// 创建简单配置
    pub fn create_simple_config(&self, target_lang: &str, api_url: Option<&str>) -> TranslationConfig {
        let mut config = self.config.clone();
        config.target_lang = target_lang.to_string();
        if let Some(url) = api_url {
            config.api_url = url.to_string();
        }
        config
    }

    /// 从文件加载配置
    fn load_config() -> TranslationResult<TranslationConfig> {
        // 首先尝试加载 .env 文件
        Self::load_dotenv();

        // 查找配置文件
        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(&expanded_path);
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(TranslationConfig::default())
    }

    /// 从指定文件加载配置
    fn load_from_file(path: &str) -> TranslationResult<TranslationConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TranslationError::ConfigError(format!("读取配置文件失败 '{}': {}", path, e)))?;
        Self::parse_config(path, &content)
    }

    /// 按扩展名解析配置内容
    pub fn parse_config(path: &str, content: &str) -> TranslationResult<TranslationConfig> {
        // 尝试TOML格式
        if path.ends_with(".toml") {
            toml::from_str(content)
                .map_err(|e| TranslationError::ConfigError(format!("解析TOML配置失败: {}", e)))
        } else {
            // 尝试JSON格式
            serde_json::from_str(content)
                .map_err(|e| TranslationError::ConfigError(format!("解析JSON配置失败: {}", e)))
        }
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        for env_file in constants::ENV_FILES {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: &str) -> TranslationResult<()> {
        let content = toml::to_string_pretty(&Self::example_config())
            .map_err(|e| TranslationError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TranslationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }

    /// 带一个示例集成的配置
    pub fn example_config() -> TranslationConfig {
        use crate::translation::pipeline::matcher::MatchMode;

        TranslationConfig {
            integrations: vec![IntegrationConfig {
                name: "shop".to_string(),
                rules: vec![
                    RuleSpec::new("sku", MatchMode::Exact, Disposition::Deny),
                    RuleSpec::new("currency", MatchMode::Exact, Disposition::Deny),
                    RuleSpec::new(r"^.*_url$", MatchMode::RegexFull, Disposition::Deny),
                ],
                fragments: vec![FragmentOverride::new("cart_params")],
                filter: None,
            }],
            ..TranslationConfig::default()
        }
    }
}
