//! Monetary amounts in minor units.
//!
//! The protocol transmits amounts as `{assetCode, assetScale, value}` with
//! `value` encoded as a decimal string. Two amounts are comparable or
//! addable only when asset code and scale match; cross-asset values are
//! bridged exclusively by protocol-computed quotes.

use serde::{Deserialize, Serialize};

use crate::error::PaymentError;

/// A monetary amount: integer `value` in minor units of `asset_code` at
/// `asset_scale` decimal places.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Amount {
    pub asset_code: String,
    pub asset_scale: u8,
    #[serde(with = "string_u64")]
    pub value: u64,
}

impl Amount {
    pub fn new(asset_code: impl Into<String>, asset_scale: u8, value: u64) -> Self {
        Self {
            asset_code: asset_code.into(),
            asset_scale,
            value,
        }
    }

    /// True when `other` is denominated in the same asset at the same scale.
    pub fn same_asset(&self, other: &Amount) -> bool {
        self.asset_code == other.asset_code && self.asset_scale == other.asset_scale
    }

    /// Add two amounts of the same asset. Mismatched assets are a usage
    /// error, not a conversion opportunity.
    pub fn checked_add(&self, other: &Amount) -> Result<Amount, PaymentError> {
        if !self.same_asset(other) {
            return Err(PaymentError::Validation(format!(
                "cannot add {}@{} to {}@{}: asset mismatch",
                other.asset_code, other.asset_scale, self.asset_code, self.asset_scale
            )));
        }
        let value = self.value.checked_add(other.value).ok_or_else(|| {
            PaymentError::Validation("amount addition overflowed u64".to_string())
        })?;
        Ok(Amount::new(self.asset_code.clone(), self.asset_scale, value))
    }

    /// A new amount in the same asset with a different value.
    pub fn with_value(&self, value: u64) -> Amount {
        Amount::new(self.asset_code.clone(), self.asset_scale, value)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} (scale {})", self.value, self.asset_code, self.asset_scale)
    }
}

/// Serde helper: u64 encoded as a decimal string on the wire.
mod string_u64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<u64>().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format_uses_string_value() {
        let amount = Amount::new("USD", 2, 15000);
        let json = serde_json::to_value(&amount).unwrap();
        assert_eq!(json["assetCode"], "USD");
        assert_eq!(json["assetScale"], 2);
        assert_eq!(json["value"], "15000");

        let restored: Amount = serde_json::from_value(json).unwrap();
        assert_eq!(restored, amount);
    }

    #[test]
    fn test_checked_add_same_asset() {
        let a = Amount::new("EUR", 2, 100);
        let b = Amount::new("EUR", 2, 250);
        assert_eq!(a.checked_add(&b).unwrap().value, 350);
    }

    #[test]
    fn test_checked_add_rejects_asset_mismatch() {
        let a = Amount::new("EUR", 2, 100);
        let b = Amount::new("USD", 2, 100);
        assert!(matches!(
            a.checked_add(&b),
            Err(PaymentError::Validation(_))
        ));

        // Same code, different scale is still a mismatch.
        let c = Amount::new("EUR", 4, 100);
        assert!(a.checked_add(&c).is_err());
    }

    #[test]
    fn test_checked_add_overflow() {
        let a = Amount::new("USD", 2, u64::MAX);
        let b = Amount::new("USD", 2, 1);
        assert!(a.checked_add(&b).is_err());
    }
}
