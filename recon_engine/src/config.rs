//! Environment-driven engine configuration.
use std::env;

use log::*;
use recon_common::Money;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/recon_store.db";
/// One minor unit (0.01).
const DEFAULT_AMOUNT_TOLERANCE: Money = Money::from_minor(1);
const DEFAULT_BATCH_SIZE: u32 = 100;

/// Runtime knobs for the reconciliation engine.
#[derive(Clone, Debug)]
pub struct ReconConfig {
    pub database_url: String,
    /// Maximum acceptable difference between the reported pay amount and the computed total.
    pub amount_tolerance: Money,
    /// Page size used by the batch sweep.
    pub batch_size: u32,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            amount_tolerance: DEFAULT_AMOUNT_TOLERANCE,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl ReconConfig {
    /// Builds a configuration from `RECON_DATABASE_URL`, `RECON_AMOUNT_TOLERANCE` (a decimal amount,
    /// e.g. `0.01`) and `RECON_BATCH_SIZE`, falling back to the defaults for anything unset or
    /// unparseable.
    pub fn from_env_or_default() -> Self {
        let database_url = env::var("RECON_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ RECON_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let amount_tolerance = env::var("RECON_AMOUNT_TOLERANCE")
            .map(|s| {
                s.parse::<Money>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid amount for RECON_AMOUNT_TOLERANCE. {e} Using the default, \
                         {DEFAULT_AMOUNT_TOLERANCE}, instead."
                    );
                    DEFAULT_AMOUNT_TOLERANCE
                })
            })
            .ok()
            .unwrap_or(DEFAULT_AMOUNT_TOLERANCE);
        let batch_size = env::var("RECON_BATCH_SIZE")
            .map(|s| {
                s.parse::<u32>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid size for RECON_BATCH_SIZE. {e} Using the default, \
                         {DEFAULT_BATCH_SIZE}, instead."
                    );
                    DEFAULT_BATCH_SIZE
                })
            })
            .ok()
            .unwrap_or(DEFAULT_BATCH_SIZE);
        Self { database_url, amount_tolerance, batch_size }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ReconConfig::default();
        assert_eq!(config.amount_tolerance, Money::from_minor(1));
        assert_eq!(config.batch_size, 100);
        assert!(config.database_url.starts_with("sqlite://"));
    }
}
