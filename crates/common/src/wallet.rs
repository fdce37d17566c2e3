//! Wallet address metadata.

use serde::{Deserialize, Serialize};

use crate::amount::Amount;

/// A resolved wallet address: the payment account's identifier URL plus the
/// locations of its authorization and resource servers and its asset
/// denomination. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAddress {
    /// Identifier URL of the wallet address itself.
    pub id: String,
    pub auth_server: String,
    pub resource_server: String,
    pub asset_code: String,
    pub asset_scale: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_name: Option<String>,
}

impl WalletAddress {
    /// An amount of `value` minor units in this wallet's asset.
    pub fn amount(&self, value: u64) -> Amount {
        Amount::new(self.asset_code.clone(), self.asset_scale, value)
    }

    /// True when `other` settles in a different asset or scale, which means
    /// quotes between the two wallets involve an exchange.
    pub fn is_cross_asset(&self, other: &WalletAddress) -> bool {
        self.asset_code != other.asset_code || self.asset_scale != other.asset_scale
    }
}
