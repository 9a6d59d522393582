use crate::{
    errors::CoinOpError,
    gen::{EntryPoint, SimpleAccountFactory},
    traits::ChainReader,
};
use async_trait::async_trait;
use ethers::{
    providers::{Http, Middleware, Provider},
    types::{Address, BlockId, BlockNumber, Bytes, TransactionReceipt, H256, U256},
};
use std::sync::Arc;
use tracing::debug;

/// [ChainReader] over any ethers middleware
#[derive(Debug)]
pub struct ChainClient<M> {
    provider: Arc<M>,
}

impl<M> Clone for ChainClient<M> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
        }
    }
}

impl ChainClient<Provider<Http>> {
    /// Connects to a JSON-RPC node over HTTP
    pub fn from_url(rpc_url: &str) -> Result<Self, CoinOpError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| CoinOpError::Config(format!("invalid rpc url {rpc_url}: {e}")))?;
        Ok(Self::new(Arc::new(provider)))
    }
}

impl<M: Middleware + 'static> ChainClient<M> {
    pub fn new(provider: Arc<M>) -> Self {
        Self { provider }
    }

    /// Fails with [CoinOpError::Config] when the node serves another chain
    pub async fn verify_chain(&self, expected: u64) -> Result<(), CoinOpError> {
        let actual = self.chain_id().await?;
        if actual != expected {
            return Err(CoinOpError::Config(format!(
                "rpc endpoint serves chain {actual}, selected network expects {expected}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<M: Middleware + 'static> ChainReader for ChainClient<M> {
    async fn chain_id(&self) -> Result<u64, CoinOpError> {
        let chain_id = self
            .provider
            .get_chainid()
            .await
            .map_err(CoinOpError::network)?;
        Ok(chain_id.as_u64())
    }

    async fn balance(&self, address: Address) -> Result<U256, CoinOpError> {
        self.provider
            .get_balance(address, None)
            .await
            .map_err(CoinOpError::network)
    }

    async fn code(&self, address: Address) -> Result<Bytes, CoinOpError> {
        self.provider
            .get_code(address, None)
            .await
            .map_err(CoinOpError::network)
    }

    async fn estimate_fees(&self) -> Result<(U256, U256), CoinOpError> {
        let (max_fee, priority_fee) = self
            .provider
            .estimate_eip1559_fees(None)
            .await
            .map_err(CoinOpError::network)?;
        debug!(?max_fee, ?priority_fee, "estimated eip1559 fees");
        Ok((max_fee, priority_fee))
    }

    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>, CoinOpError> {
        self.provider
            .get_transaction_receipt(hash)
            .await
            .map_err(CoinOpError::network)
    }

    async fn block_timestamp(&self, number: u64) -> Result<u64, CoinOpError> {
        let block = self
            .provider
            .get_block(BlockId::Number(BlockNumber::Number(number.into())))
            .await
            .map_err(CoinOpError::network)?
            .ok_or_else(|| CoinOpError::Network(format!("block {number} not found")))?;
        Ok(block.timestamp.as_u64())
    }

    async fn account_address(
        &self,
        factory: Address,
        owner: Address,
        index: U256,
    ) -> Result<Address, CoinOpError> {
        SimpleAccountFactory::new(factory, self.provider.clone())
            .get_address(owner, index)
            .call()
            .await
            .map_err(CoinOpError::network)
    }

    async fn entry_point_nonce(
        &self,
        entry_point: Address,
        sender: Address,
    ) -> Result<U256, CoinOpError> {
        EntryPoint::new(entry_point, self.provider.clone())
            .get_nonce(sender, U256::zero())
            .call()
            .await
            .map_err(CoinOpError::network)
    }
}
