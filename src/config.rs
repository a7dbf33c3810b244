// 7.0 config.rs: all settings in one place. fees, interest, credit, retry bounds.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Quote;

// Complete configuration for the ledger engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    // Base (settlement) currency code
    pub base_currency: String,
    // Fee charged on every sell leg, as a fraction (0.0005 = 0.05%)
    pub sell_fee_rate: Decimal,
    // Interest charged per calendar day on borrowed credit (0.001 = 0.1%)
    pub daily_interest_rate: Decimal,
    // Credit ceiling assigned to new accounts
    pub default_credit_limit: Quote,
    // Cash assigned to new accounts
    pub starting_balance: Quote,
    // How many Buy/Cover records the liquidation LIFO pass looks back over
    pub liquidation_lookback: usize,
    // Attempts before an atomic commit gives up with ConcurrentModification
    pub max_txn_retries: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            base_currency: "KRW".to_string(),
            sell_fee_rate: dec!(0.0005),
            daily_interest_rate: dec!(0.001),
            default_credit_limit: Quote::new(dec!(500_000_000)),
            starting_balance: Quote::new(dec!(100_000_000)),
            liquidation_lookback: 50,
            max_txn_retries: 5,
        }
    }
}

impl LedgerConfig {
    // Small-number preset that keeps test arithmetic readable
    pub fn sandbox() -> Self {
        let mut config = Self::default();
        config.default_credit_limit = Quote::new(dec!(1_000_000));
        config.starting_balance = Quote::new(dec!(1_000_000));
        config.liquidation_lookback = 10;
        config
    }

    // Tighter credit and zero starting cash, for exercising rejection paths
    pub fn strict_credit() -> Self {
        let mut config = Self::default();
        config.default_credit_limit = Quote::new(dec!(100_000));
        config.starting_balance = Quote::zero();
        config
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sell_fee_rate < Decimal::ZERO || self.sell_fee_rate >= dec!(0.01) {
            return Err(ConfigError::InvalidFees {
                reason: "sell fee must be in [0, 1%)".to_string(),
            });
        }

        if self.daily_interest_rate < Decimal::ZERO || self.daily_interest_rate >= dec!(0.1) {
            return Err(ConfigError::InvalidInterest {
                reason: "daily interest must be in [0, 10%)".to_string(),
            });
        }

        if self.default_credit_limit.is_negative() || self.starting_balance.is_negative() {
            return Err(ConfigError::InvalidCredit {
                reason: "credit limit and starting balance must be non-negative".to_string(),
            });
        }

        if self.liquidation_lookback == 0 {
            return Err(ConfigError::InvalidLiquidation {
                reason: "lookback must cover at least one record".to_string(),
            });
        }

        if self.max_txn_retries == 0 {
            return Err(ConfigError::InvalidConcurrency {
                reason: "need at least one commit attempt".to_string(),
            });
        }

        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidFees { reason: String },
    InvalidInterest { reason: String },
    InvalidCredit { reason: String },
    InvalidLiquidation { reason: String },
    InvalidConcurrency { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_valid() {
        assert!(LedgerConfig::default().validate().is_ok());
    }

    #[test]
    fn presets_valid() {
        assert!(LedgerConfig::sandbox().validate().is_ok());
        assert!(LedgerConfig::strict_credit().validate().is_ok());
    }

    #[test]
    fn invalid_fee_rejected() {
        let mut config = LedgerConfig::default();
        config.sell_fee_rate = dec!(0.05);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFees { .. })
        ));
    }

    #[test]
    fn zero_retries_rejected() {
        let mut config = LedgerConfig::default();
        config.max_txn_retries = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConcurrency { .. })
        ));
    }

    #[test]
    fn config_serialization() {
        let config = LedgerConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: LedgerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.base_currency, config.base_currency);
        assert_eq!(back.sell_fee_rate, config.sell_fee_rate);
    }
}
