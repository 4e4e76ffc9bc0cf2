use crate::core::classifier::DEFAULT_PRIMARY_FEE_AMOUNT;
use crate::utils::error::{MarkerError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub marketplace: MarketplaceConfig,
    pub classifier: ClassifierConfig,
    pub search: SearchConfig,
    pub channel: ChannelConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    pub graphql_endpoint: String,
    /// Substring identifying intercepted calls to the marketplace API.
    pub intercept_pattern: String,
    pub collection_page_size: usize,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            graphql_endpoint: "https://getgems.io/graphql/".to_string(),
            intercept_pattern: "getgems.io/graphql".to_string(),
            collection_page_size: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Observed primary-marketplace network fee, in minimal units.
    pub primary_fee_amount: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            primary_fee_amount: DEFAULT_PRIMARY_FEE_AMOUNT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub response_max_depth: usize,
    pub page_state_max_depth: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            response_max_depth: 15,
            page_state_max_depth: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

impl EngineConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(MarkerError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置，未提供的欄位使用預設值
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| MarkerError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${GRAPHQL_ENDPOINT})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<()> {
        validate_url("marketplace.graphql_endpoint", &self.marketplace.graphql_endpoint)?;
        validate_non_empty_string(
            "marketplace.intercept_pattern",
            &self.marketplace.intercept_pattern,
        )?;
        validate_positive_number(
            "marketplace.collection_page_size",
            self.marketplace.collection_page_size,
            1,
        )?;
        validate_positive_number(
            "classifier.primary_fee_amount",
            self.classifier.primary_fee_amount,
            1,
        )?;
        validate_range("search.response_max_depth", self.search.response_max_depth, 1, 64)?;
        validate_range("search.page_state_max_depth", self.search.page_state_max_depth, 1, 64)?;
        validate_positive_number("channel.capacity", self.channel.capacity, 1)?;
        Ok(())
    }
}
