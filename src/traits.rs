use crate::{
    errors::CoinOpError,
    signer::Owner,
    types::{
        EstimateResult, SmartAccountHandle, SponsorResult, UserOperation, UserOperationHash,
        UserOperationReceipt,
    },
};
use async_trait::async_trait;
use core::fmt::Debug;
use ethers::types::{Address, Bytes, Signature, TransactionReceipt, H256, U256};

/// Signing capability of an embedded wallet, whatever SDK backs it
#[async_trait]
pub trait EmbeddedWallet: Debug + Send + Sync {
    /// Accounts the wallet currently exposes. Empty while the wallet is still initializing.
    async fn accounts(&self) -> anyhow::Result<Vec<Address>>;

    /// EIP-191 signs `message` with `account`
    ///
    /// # Arguments
    /// * `account` - One of the addresses returned by [accounts](EmbeddedWallet::accounts)
    /// * `message` - The raw message, hashed with the personal-message prefix
    async fn sign_message(&self, account: Address, message: &[u8]) -> anyhow::Result<Signature>;
}

/// Builds a smart contract account handle for an owner
#[async_trait]
pub trait AccountBuilder: Debug + Send + Sync {
    /// Construct (or look up) the smart account bound to `owner` on `chain_id`
    ///
    /// # Arguments
    /// * `owner` - The resolved owner key
    /// * `chain_id` - The chain the account lives on
    ///
    /// # Returns
    /// * `SmartAccountHandle` - The account handle
    async fn build(&self, owner: &Owner, chain_id: u64) -> anyhow::Result<SmartAccountHandle>;
}

/// Read-only view of chain state
#[async_trait]
pub trait ChainReader: Debug + Send + Sync {
    async fn chain_id(&self) -> Result<u64, CoinOpError>;

    async fn balance(&self, address: Address) -> Result<U256, CoinOpError>;

    async fn code(&self, address: Address) -> Result<Bytes, CoinOpError>;

    /// Returns `(max_fee_per_gas, max_priority_fee_per_gas)`
    async fn estimate_fees(&self) -> Result<(U256, U256), CoinOpError>;

    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>, CoinOpError>;

    /// Timestamp of block `number`, unix seconds
    async fn block_timestamp(&self, number: u64) -> Result<u64, CoinOpError>;

    /// Counterfactual account address from the account factory's `getAddress`
    async fn account_address(
        &self,
        factory: Address,
        owner: Address,
        index: U256,
    ) -> Result<Address, CoinOpError>;

    /// Entry point nonce of `sender` for the default key
    async fn entry_point_nonce(
        &self,
        entry_point: Address,
        sender: Address,
    ) -> Result<U256, CoinOpError>;
}

/// Paymaster/bundler relay that gets user operations on chain without the sender paying gas
#[async_trait]
pub trait SponsorRelay: Debug + Send + Sync {
    async fn estimate_user_operation_gas(
        &self,
        user_operation: &UserOperation,
    ) -> Result<EstimateResult, CoinOpError>;

    /// Asks the paymaster to cover the operation's gas
    async fn sponsor_user_operation(
        &self,
        user_operation: &UserOperation,
    ) -> Result<SponsorResult, CoinOpError>;

    async fn send_user_operation(
        &self,
        user_operation: &UserOperation,
    ) -> Result<UserOperationHash, CoinOpError>;

    /// `None` until the operation is included in a block
    async fn user_operation_receipt(
        &self,
        hash: UserOperationHash,
    ) -> Result<Option<UserOperationReceipt>, CoinOpError>;
}
