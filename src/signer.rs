use crate::{session::SessionContext, traits::EmbeddedWallet};
use async_trait::async_trait;
use ethers::{
    signers::{LocalWallet, Signer},
    types::{Address, Signature},
};
use std::sync::Arc;
use tracing::{debug, warn};

/// The owner key a smart account is bound to
#[derive(Debug, Clone)]
pub struct Owner {
    pub address: Address,
    pub wallet: Arc<dyn EmbeddedWallet>,
}

impl PartialEq for Owner {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Owner {}

impl Owner {
    pub async fn sign_message(&self, message: &[u8]) -> anyhow::Result<Signature> {
        self.wallet.sign_message(self.address, message).await
    }
}

/// Outcome of resolving the session's signing capability
#[derive(Debug, Clone)]
pub enum Resolution {
    /// No wallet attached to the session
    NotAuthenticated,
    /// Authenticated, wallet still has no account
    Pending,
    Ready(Owner),
}

/// Turns the session's embedded wallet into an [Owner]
#[derive(Debug, Default, Clone, Copy)]
pub struct SignerResolver;

impl SignerResolver {
    /// Resolves the owner of the session. The first exposed account is the owner.
    ///
    /// A wallet that errors while listing accounts is reported as [Resolution::Pending]:
    /// embedded wallets commonly fail until their iframe or enclave finishes loading.
    pub async fn resolve(&self, session: &SessionContext) -> Resolution {
        let wallet = match session.wallet() {
            Some(wallet) => wallet,
            None => return Resolution::NotAuthenticated,
        };
        let accounts = match wallet.accounts().await {
            Ok(accounts) => accounts,
            Err(err) => {
                warn!("embedded wallet not ready: {err}");
                return Resolution::Pending;
            }
        };
        match accounts.first() {
            Some(address) => {
                debug!(owner = ?address, "resolved owner");
                Resolution::Ready(Owner {
                    address: *address,
                    wallet,
                })
            }
            None => Resolution::Pending,
        }
    }
}

#[async_trait]
impl EmbeddedWallet for LocalWallet {
    async fn accounts(&self) -> anyhow::Result<Vec<Address>> {
        Ok(vec![self.address()])
    }

    async fn sign_message(&self, account: Address, message: &[u8]) -> anyhow::Result<Signature> {
        if account != self.address() {
            anyhow::bail!("account {account:?} is not held by this wallet");
        }
        let signature = Signer::sign_message(self, message).await?;
        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::NetworkConfig, consts::SEED_PHRASE, testing::MockWallet, utils::build_wallet,
    };

    #[tokio::test]
    async fn test_resolve_without_wallet_is_not_authenticated() {
        let session = SessionContext::anonymous(NetworkConfig::base_sepolia());
        assert!(matches!(
            SignerResolver.resolve(&session).await,
            Resolution::NotAuthenticated
        ));
    }

    #[tokio::test]
    async fn test_resolve_empty_wallet_is_pending() {
        let wallet = Arc::new(MockWallet::empty());
        let session = SessionContext::new(wallet.clone(), NetworkConfig::base_sepolia());
        assert!(matches!(
            SignerResolver.resolve(&session).await,
            Resolution::Pending
        ));

        wallet.add_account(Address::repeat_byte(0xab));
        match SignerResolver.resolve(&session).await {
            Resolution::Ready(owner) => assert_eq!(owner.address, Address::repeat_byte(0xab)),
            other => panic!("unexpected resolution {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_local_wallet_signature_recovers_owner() {
        let wallet = build_wallet(SEED_PHRASE).unwrap();
        let address = wallet.address();
        let session = SessionContext::new(Arc::new(wallet), NetworkConfig::base_sepolia());

        let owner = match SignerResolver.resolve(&session).await {
            Resolution::Ready(owner) => owner,
            other => panic!("unexpected resolution {other:?}"),
        };
        let signature = owner.sign_message(b"user operation").await.unwrap();
        assert_eq!(signature.recover(&b"user operation"[..]).unwrap(), address);
    }

    #[tokio::test]
    async fn test_local_wallet_refuses_foreign_account() {
        let wallet = build_wallet(SEED_PHRASE).unwrap();
        let err = EmbeddedWallet::sign_message(&wallet, Address::repeat_byte(1), b"x").await;
        assert!(err.is_err());
    }
}
