use crate::{
    config::ConfirmationConfig,
    consts::{COIN_CREATED_EVENT, COIN_CREATED_V4_EVENT},
    errors::CoinOpError,
    traits::{ChainReader, SponsorRelay},
    types::{DeploymentResult, TransactionHandle, UserOperationHash, UserOperationReceipt},
};
use ethers::{
    abi::{self, ParamType},
    types::{Address, Log, H256, U64},
    utils::keccak256,
};
use std::{sync::Arc, time::Duration};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Waits for a submitted user operation and extracts the deployed coin
#[derive(Debug, Clone)]
pub struct ConfirmationWatcher {
    relay: Arc<dyn SponsorRelay>,
    chain: Arc<dyn ChainReader>,
    timeout: Duration,
    poll_interval: Duration,
}

impl ConfirmationWatcher {
    pub fn new(
        relay: Arc<dyn SponsorRelay>,
        chain: Arc<dyn ChainReader>,
        config: ConfirmationConfig,
    ) -> Self {
        Self {
            relay,
            chain,
            timeout: config.timeout(),
            poll_interval: config.poll_interval(),
        }
    }

    pub async fn await_result(
        &self,
        handle: &TransactionHandle,
    ) -> Result<DeploymentResult, CoinOpError> {
        let hash = handle.user_op_hash;
        let receipt = match timeout(self.timeout, self.poll_receipt(hash)).await {
            Ok(receipt) => receipt?,
            Err(_) => {
                warn!(?hash, "user operation not confirmed in time");
                return Err(CoinOpError::ConfirmationTimeout {
                    hash,
                    waited: self.timeout,
                });
            }
        };

        if !receipt.success {
            return Err(CoinOpError::ConfirmationFailed {
                hash,
                reason: receipt
                    .reason
                    .clone()
                    .unwrap_or_else(|| "execution reverted".to_string()),
            });
        }

        // the node's view of the bundle transaction wins over the bundler's copy
        let transaction_hash = receipt.receipt.transaction_hash;
        let onchain = self
            .chain
            .transaction_receipt(transaction_hash)
            .await?
            .unwrap_or_else(|| receipt.receipt.clone());
        if onchain.status == Some(U64::zero()) {
            return Err(CoinOpError::ConfirmationFailed {
                hash,
                reason: format!("bundle transaction {transaction_hash:?} reverted"),
            });
        }
        let block_number = onchain.block_number.ok_or_else(|| {
            CoinOpError::Network(format!("receipt of {transaction_hash:?} has no block"))
        })?;

        let address = self.deployed_address(handle, &receipt).await?;
        let confirmed_at = self.chain.block_timestamp(block_number.as_u64()).await?;
        info!(?hash, coin = ?address, block = %block_number, "coin deployment confirmed");

        Ok(DeploymentResult {
            user_op_hash: hash,
            transaction_hash,
            address,
            confirmed_at,
            chain_id: handle.chain_id,
            smart_account_address: handle.sender,
        })
    }

    async fn poll_receipt(
        &self,
        hash: UserOperationHash,
    ) -> Result<UserOperationReceipt, CoinOpError> {
        loop {
            match self.relay.user_operation_receipt(hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => debug!(?hash, "user operation pending"),
                Err(CoinOpError::Network(err)) => warn!(?hash, "receipt lookup failed: {err}"),
                Err(err) => return Err(err),
            }
            sleep(self.poll_interval).await;
        }
    }

    /// Coin announced by the factory's creation event for this sender
    async fn deployed_address(
        &self,
        handle: &TransactionHandle,
        receipt: &UserOperationReceipt,
    ) -> Result<Address, CoinOpError> {
        let coin = receipt
            .logs
            .iter()
            .filter(|log| log.address == handle.factory)
            .find_map(|log| coin_created(log, handle.sender))
            .ok_or_else(|| CoinOpError::ConfirmationFailed {
                hash: handle.user_op_hash,
                reason: "factory emitted no coin creation event".to_string(),
            })?;

        if self.chain.code(coin).await?.is_empty() {
            return Err(CoinOpError::ConfirmationFailed {
                hash: handle.user_op_hash,
                reason: format!("announced coin {coin:?} has no code"),
            });
        }
        Ok(coin)
    }
}

/// Decodes the coin address from a factory creation event emitted for `caller`
fn coin_created(log: &Log, caller: Address) -> Option<Address> {
    let topic = *log.topics.first()?;
    let pool = if topic == H256::from(keccak256(COIN_CREATED_V4_EVENT)) {
        vec![
            ParamType::Tuple(vec![
                ParamType::Address,
                ParamType::Address,
                ParamType::Uint(24),
                ParamType::Int(24),
                ParamType::Address,
            ]),
            ParamType::FixedBytes(32),
        ]
    } else if topic == H256::from(keccak256(COIN_CREATED_EVENT)) {
        vec![ParamType::Address]
    } else {
        return None;
    };
    if log.topics.get(1).map(|t| Address::from(*t)) != Some(caller) {
        return None;
    }

    // currency, uri, name, symbol, coin, pool.., version
    let mut params = vec![
        ParamType::Address,
        ParamType::String,
        ParamType::String,
        ParamType::String,
        ParamType::Address,
    ];
    params.extend(pool);
    params.push(ParamType::String);
    let tokens = abi::decode(&params, &log.data).ok()?;
    tokens.into_iter().nth(4)?.into_address()
}
