use crate::{
    config::NetworkConfig,
    consts::{
        CALL_GAS_MULTIPLIER, DUMMY_PAYMASTER_AND_DATA, POOL_CONFIG_VERSION,
        POOL_MAX_DISCOVERY_SUPPLY_SHARE, POOL_NUM_DISCOVERY_POSITIONS, POOL_TICK_LOWER,
        POOL_TICK_UPPER, PRE_VERIFICATION_GAS_BUFFER,
    },
    errors::CoinOpError,
    gen::{DeployCreatorCoinCall, ExecuteCall},
    traits::{ChainReader, SponsorRelay},
    types::{
        decode_hex_const, DeploymentRequest, SmartAccountHandle, TransactionHandle, UserOperation,
    },
};
use ethers::{
    abi::{self, AbiEncode, Token},
    types::{Address, Bytes, H256, U256},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// `int24` as a two's complement ABI word
fn int_token(value: i32) -> Token {
    let magnitude = U256::from(value.unsigned_abs());
    if value < 0 {
        Token::Int(U256::MAX - magnitude + U256::one())
    } else {
        Token::Int(magnitude)
    }
}

/// Pool configuration of a coin paired with the native asset:
/// `abi.encode(uint8 version, address currency, int24[] tickLower, int24[] tickUpper,
/// uint16[] numDiscoveryPositions, uint256[] maxDiscoverySupplyShare)`
pub fn encode_pool_config() -> Bytes {
    Bytes::from(abi::encode(&[
        Token::Uint(U256::from(POOL_CONFIG_VERSION)),
        Token::Address(Address::zero()),
        Token::Array(vec![int_token(POOL_TICK_LOWER)]),
        Token::Array(vec![int_token(POOL_TICK_UPPER)]),
        Token::Array(vec![Token::Uint(U256::from(POOL_NUM_DISCOVERY_POSITIONS))]),
        Token::Array(vec![Token::Uint(U256::from(
            POOL_MAX_DISCOVERY_SUPPLY_SHARE,
        ))]),
    ]))
}

/// Arguments of one `deployCreatorCoin` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinDeployment {
    pub payout_recipient: Address,
    pub owners: Vec<Address>,
    pub uri: String,
    pub name: String,
    pub symbol: String,
    pub pool_config: Bytes,
    pub platform_referrer: Address,
    pub salt: H256,
}

impl CoinDeployment {
    /// Royalties and ownership both go to the smart account, never to the owner key
    pub fn for_account(
        account: &SmartAccountHandle,
        request: &DeploymentRequest,
        salt: H256,
        default_referrer: Address,
    ) -> Self {
        Self {
            payout_recipient: account.address,
            owners: vec![account.address],
            uri: request.metadata_uri.clone(),
            name: request.name.clone(),
            symbol: request.symbol.clone(),
            pool_config: encode_pool_config(),
            platform_referrer: request.platform_referrer.unwrap_or(default_referrer),
            salt,
        }
    }

    pub fn factory_calldata(&self) -> Bytes {
        Bytes::from(
            DeployCreatorCoinCall {
                payout_recipient: self.payout_recipient,
                owners: self.owners.clone(),
                uri: self.uri.clone(),
                name: self.name.clone(),
                symbol: self.symbol.clone(),
                pool_config: self.pool_config.clone(),
                platform_referrer: self.platform_referrer,
                coin_salt: self.salt.0,
            }
            .encode(),
        )
    }

    /// Smart account `execute(factory, 0, deployCreatorCoin(..))`
    pub fn account_calldata(&self, factory: Address) -> Bytes {
        Bytes::from(
            ExecuteCall {
                dest: factory,
                value: U256::zero(),
                func: self.factory_calldata(),
            }
            .encode(),
        )
    }
}

/// Sends coin deployments as sponsored user operations
#[derive(Debug, Clone)]
pub struct SponsoredSubmitter {
    chain: Arc<dyn ChainReader>,
    relay: Arc<dyn SponsorRelay>,
    network: NetworkConfig,
}

impl SponsoredSubmitter {
    pub fn new(
        chain: Arc<dyn ChainReader>,
        relay: Arc<dyn SponsorRelay>,
        network: NetworkConfig,
    ) -> Self {
        Self {
            chain,
            relay,
            network,
        }
    }

    /// Builds, sponsors, signs and sends the deployment. Returns as soon as the
    /// bundler accepted the operation.
    pub async fn submit(
        &self,
        account: &SmartAccountHandle,
        request: &DeploymentRequest,
        salt: H256,
    ) -> Result<TransactionHandle, CoinOpError> {
        request.validate()?;
        if account.chain_id != self.network.chain_id {
            return Err(CoinOpError::Config(format!(
                "account belongs to chain {}, submitter targets {}",
                account.chain_id, self.network.chain_id
            )));
        }

        let deployment =
            CoinDeployment::for_account(account, request, salt, self.network.platform_referrer);
        let call_data = deployment.account_calldata(self.network.coin_factory);
        let user_operation = self.build_user_operation(account, call_data).await?;

        let user_op_hash = self
            .relay
            .send_user_operation(&user_operation)
            .await
            .map_err(|e| {
                warn!("bundler rejected user operation: {e}");
                e
            })?;
        let expected = user_operation.hash(self.network.entry_point, self.network.chain_id);
        if user_op_hash != expected {
            warn!(?user_op_hash, ?expected, "bundler returned an unexpected user operation hash");
        }
        info!(
            ?user_op_hash,
            sender = ?account.address,
            name = %request.name,
            symbol = %request.symbol,
            "submitted sponsored coin deployment"
        );

        Ok(TransactionHandle {
            user_op_hash,
            chain_id: self.network.chain_id,
            sender: account.address,
            entry_point: self.network.entry_point,
            factory: self.network.coin_factory,
            salt,
        })
    }

    async fn build_user_operation(
        &self,
        account: &SmartAccountHandle,
        call_data: Bytes,
    ) -> Result<UserOperation, CoinOpError> {
        let init_code = self.init_code(account).await?;
        let nonce = self
            .chain
            .entry_point_nonce(self.network.entry_point, account.address)
            .await?;
        let (max_fee_per_gas, max_priority_fee_per_gas) = self.chain.estimate_fees().await?;

        let mut uo = UserOperation {
            max_fee_per_gas,
            max_priority_fee_per_gas,
            paymaster_and_data: decode_hex_const(DUMMY_PAYMASTER_AND_DATA),
            ..UserOperation::new(account.address, nonce, init_code, call_data)
        };

        let estimate = self.relay.estimate_user_operation_gas(&uo).await?;
        debug!(?estimate, "bundler gas estimate");
        uo.pre_verification_gas = estimate
            .pre_verification_gas
            .saturating_add(U256::from(PRE_VERIFICATION_GAS_BUFFER));
        uo.verification_gas_limit = estimate.verification_gas_limit;
        uo.call_gas_limit = estimate
            .call_gas_limit
            .saturating_mul(U256::from(CALL_GAS_MULTIPLIER));

        let sponsor = self.relay.sponsor_user_operation(&uo).await?;
        uo.paymaster_and_data = sponsor.paymaster_and_data;
        if let Some(gas) = sponsor.pre_verification_gas {
            uo.pre_verification_gas = gas;
        }
        if let Some(gas) = sponsor.verification_gas_limit {
            uo.verification_gas_limit = gas;
        }
        if let Some(gas) = sponsor.call_gas_limit {
            uo.call_gas_limit = gas;
        }

        let hash = uo.hash(self.network.entry_point, self.network.chain_id);
        let signature = account
            .owner
            .sign_message(hash.as_bytes())
            .await
            .map_err(|e| CoinOpError::SigningFailed(format!("{e:#}")))?;
        uo.signature = Bytes::from(signature.to_vec());
        Ok(uo)
    }

    /// The handle may predate the account's deployment by an earlier operation
    async fn init_code(&self, account: &SmartAccountHandle) -> Result<Bytes, CoinOpError> {
        let init_code = account.init_code();
        if init_code.is_empty() {
            return Ok(init_code);
        }
        if self.chain.code(account.address).await?.is_empty() {
            Ok(init_code)
        } else {
            debug!(account = ?account.address, "account already deployed, dropping init code");
            Ok(Bytes::default())
        }
    }
}
