use crate::{config::NetworkConfig, traits::EmbeddedWallet};
use std::sync::Arc;

/// Per-session inputs of the deployment flow: the authenticated wallet, if any,
/// and the selected network.
#[derive(Debug, Clone)]
pub struct SessionContext {
    wallet: Option<Arc<dyn EmbeddedWallet>>,
    network: NetworkConfig,
}

impl SessionContext {
    pub fn new(wallet: Arc<dyn EmbeddedWallet>, network: NetworkConfig) -> Self {
        Self {
            wallet: Some(wallet),
            network,
        }
    }

    /// A session without a logged-in user
    pub fn anonymous(network: NetworkConfig) -> Self {
        Self {
            wallet: None,
            network,
        }
    }

    pub fn wallet(&self) -> Option<Arc<dyn EmbeddedWallet>> {
        self.wallet.clone()
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn chain_id(&self) -> u64 {
        self.network.chain_id
    }

    /// Same wallet on another chain
    pub fn with_network(&self, network: NetworkConfig) -> Self {
        Self {
            wallet: self.wallet.clone(),
            network,
        }
    }
}
