//! Configuration management for the Larder cost engine
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with LARDER_ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Main engine configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Three-way match configuration
    pub matching: MatchingConfig,

    /// Consumption variance configuration
    pub variance: VarianceConfig,

    /// Recipe cost cascade configuration
    pub cascade: CascadeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MatchingConfig {
    /// Absolute difference between invoiced and expected totals tolerated
    /// before an invoice is flagged for manual approval
    pub tolerance: Decimal,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VarianceConfig {
    /// Gap percentage above which an entry raises an alert
    pub alert_threshold_percent: Decimal,

    /// Category names classified as critical (high-shrinkage categories)
    pub sensitive_categories: Vec<String>,

    /// Ingredient names classified as critical regardless of category
    pub high_value_ingredients: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CascadeConfig {
    /// Maximum recipes recomputed inline per movement; the remainder is
    /// deferred to a batch run
    pub max_fanout: usize,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("LARDER_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("matching.tolerance", "1000")?
            .set_default("variance.alert_threshold_percent", "10")?
            .set_default("variance.sensitive_categories", Vec::<String>::new())?
            .set_default("variance.high_value_ingredients", Vec::<String>::new())?
            .set_default("cascade.max_fanout", 100)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (LARDER_ prefix)
            .add_source(
                Environment::with_prefix("LARDER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            tolerance: Decimal::new(1000, 0),
        }
    }
}

impl Default for VarianceConfig {
    fn default() -> Self {
        Self {
            alert_threshold_percent: Decimal::new(10, 0),
            sensitive_categories: Vec::new(),
            high_value_ingredients: Vec::new(),
        }
    }
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self { max_fanout: 100 }
    }
}
