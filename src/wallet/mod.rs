//! Wallet connection over an externally provided signing capability
//!
//! The capability (a browser extension, a hardware signer, a test double)
//! owns every key and performs all signing. A [`WalletSession`] only tracks
//! which accounts it exposed and which one is selected, and routes calls to
//! it. A missing capability is a state, not an error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WalletError {
    #[error("Wallet is not connected")]
    NotConnected,

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Wallet extension error: {0}")]
    Capability(String),
}

/// An account exposed by the capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAccount {
    pub address: String,
    pub name: Option<String>,
    /// Extension that exposed the account
    pub source: String,
    pub account_type: Option<String>,
}

impl WalletAccount {
    pub fn new(address: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
            source: source.into(),
            account_type: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name if the extension supplied one, otherwise the address
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.address)
    }
}

/// Operations delegated to the signing extension
#[async_trait]
pub trait WalletCapability: Send + Sync {
    async fn list_accounts(&self) -> Result<Vec<WalletAccount>, WalletError>;

    /// Sign an arbitrary payload, returning the hex signature
    async fn sign_raw(&self, address: &str, data: &[u8]) -> Result<String, WalletError>;

    /// Free balance in the chain's smallest unit, as the extension reports it
    async fn get_balance(&self, address: &str) -> Result<String, WalletError>;

    /// Submit a transfer and return the transaction hash
    async fn submit_transfer(&self, from: &str, to: &str, amount: u128)
        -> Result<String, WalletError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum WalletConnection {
    /// No capability was provided, or the session was disconnected
    Unavailable,
    /// The capability exists but exposes no accounts
    NoAccounts,
    Connected {
        accounts: Vec<WalletAccount>,
        selected: usize,
    },
}

pub struct WalletSession {
    capability: Option<Arc<dyn WalletCapability>>,
    connection: WalletConnection,
}

impl WalletSession {
    /// Ask the capability for its accounts and select the first one.
    ///
    /// Only an error raised by the capability itself fails the call.
    pub async fn connect(
        capability: Option<Arc<dyn WalletCapability>>,
    ) -> Result<Self, WalletError> {
        let Some(capability) = capability else {
            info!("No wallet extension available");
            return Ok(Self {
                capability: None,
                connection: WalletConnection::Unavailable,
            });
        };

        let accounts = capability.list_accounts().await?;
        let connection = if accounts.is_empty() {
            warn!("Wallet extension exposed no accounts");
            WalletConnection::NoAccounts
        } else {
            info!("Wallet connected with {} account(s)", accounts.len());
            WalletConnection::Connected {
                accounts,
                selected: 0,
            }
        };

        Ok(Self {
            capability: Some(capability),
            connection,
        })
    }

    pub fn connection(&self) -> &WalletConnection {
        &self.connection
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.connection, WalletConnection::Connected { .. })
    }

    pub fn accounts(&self) -> &[WalletAccount] {
        match &self.connection {
            WalletConnection::Connected { accounts, .. } => accounts,
            _ => &[],
        }
    }

    pub fn selected_account(&self) -> Option<&WalletAccount> {
        match &self.connection {
            WalletConnection::Connected { accounts, selected } => accounts.get(*selected),
            _ => None,
        }
    }

    pub fn select(&mut self, address: &str) -> Result<(), WalletError> {
        let WalletConnection::Connected { accounts, selected } = &mut self.connection else {
            return Err(WalletError::NotConnected);
        };
        let index = accounts
            .iter()
            .position(|a| a.address == address)
            .ok_or_else(|| WalletError::UnknownAccount(address.to_string()))?;
        *selected = index;
        Ok(())
    }

    /// Drop the capability; later calls fail with `NotConnected`
    pub fn disconnect(&mut self) {
        self.capability = None;
        self.connection = WalletConnection::Unavailable;
    }

    fn active(&self) -> Result<(&dyn WalletCapability, &WalletAccount), WalletError> {
        match (&self.capability, self.selected_account()) {
            (Some(capability), Some(account)) => Ok((capability.as_ref(), account)),
            _ => Err(WalletError::NotConnected),
        }
    }

    pub async fn sign(&self, data: &[u8]) -> Result<String, WalletError> {
        let (capability, account) = self.active()?;
        debug!("Signing {} bytes with {}", data.len(), account.address);
        capability.sign_raw(&account.address, data).await
    }

    pub async fn balance(&self) -> Result<String, WalletError> {
        let (capability, account) = self.active()?;
        capability.get_balance(&account.address).await
    }

    /// Transfer `amount` smallest units from the selected account
    pub async fn transfer(&self, to: &str, amount: &str) -> Result<String, WalletError> {
        let (capability, account) = self.active()?;
        let value = parse_amount(amount)?;
        info!("Submitting transfer of {} from {} to {}", value, account.address, to);
        capability.submit_transfer(&account.address, to, value).await
    }
}

fn parse_amount(amount: &str) -> Result<u128, WalletError> {
    match amount.trim().parse::<u128>() {
        Ok(0) | Err(_) => Err(WalletError::InvalidAmount(amount.to_string())),
        Ok(value) => Ok(value),
    }
}
