use crate::{consts::DUMMY_SIGNATURE, errors::CoinOpError, signer::Owner};
use ethers::{
    abi::{self, Token},
    types::{Address, Bytes, Log, TransactionReceipt, H256, U256},
    utils::keccak256,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// User operation hash returned by `eth_sendUserOperation`
pub type UserOperationHash = H256;

#[derive(Debug, Serialize)]
pub struct Request<T> {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: T,
}

impl<T> Request<T> {
    pub fn new(method: &str, params: T) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: 1,
            method: method.to_string(),
            params,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResult {
    pub pre_verification_gas: U256,
    pub verification_gas_limit: U256,
    pub call_gas_limit: U256,
}

/// Paymaster answer to `pm_sponsorUserOperation`. Some paymasters also
/// return gas limits that must replace the bundler estimates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorResult {
    pub paymaster_and_data: Bytes,
    #[serde(default)]
    pub pre_verification_gas: Option<U256>,
    #[serde(default)]
    pub verification_gas_limit: Option<U256>,
    #[serde(default)]
    pub call_gas_limit: Option<U256>,
}

#[derive(Debug, Deserialize)]
pub struct Response<R> {
    pub jsonrpc: String,
    pub id: u64,
    pub result: R,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    #[allow(dead_code)]
    #[serde(default)]
    pub(crate) jsonrpc: String,
    #[allow(dead_code)]
    #[serde(default)]
    pub(crate) id: Option<u64>,
    pub(crate) error: JsonRpcError,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

/// ERC-4337 v0.6 user operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: Address,
    pub nonce: U256,
    pub init_code: Bytes,
    pub call_data: Bytes,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub paymaster_and_data: Bytes,
    pub signature: Bytes,
}

impl UserOperation {
    /// Builds an unsigned, unsponsored operation carrying the dummy signature
    /// so that it can go through gas estimation.
    pub fn new(sender: Address, nonce: U256, init_code: Bytes, call_data: Bytes) -> Self {
        Self {
            sender,
            nonce,
            init_code,
            call_data,
            call_gas_limit: U256::zero(),
            verification_gas_limit: U256::zero(),
            pre_verification_gas: U256::zero(),
            max_fee_per_gas: U256::zero(),
            max_priority_fee_per_gas: U256::zero(),
            paymaster_and_data: Bytes::default(),
            signature: dummy_signature(),
        }
    }

    /// ABI-encodes the operation without its signature, hashing the dynamic fields
    pub fn pack(&self) -> Vec<u8> {
        abi::encode(&[
            Token::Address(self.sender),
            Token::Uint(self.nonce),
            Token::FixedBytes(keccak256(&self.init_code).to_vec()),
            Token::FixedBytes(keccak256(&self.call_data).to_vec()),
            Token::Uint(self.call_gas_limit),
            Token::Uint(self.verification_gas_limit),
            Token::Uint(self.pre_verification_gas),
            Token::Uint(self.max_fee_per_gas),
            Token::Uint(self.max_priority_fee_per_gas),
            Token::FixedBytes(keccak256(&self.paymaster_and_data).to_vec()),
        ])
    }

    /// The hash the owner signs, as computed by `EntryPoint.getUserOpHash`
    pub fn hash(&self, entry_point: Address, chain_id: u64) -> UserOperationHash {
        let encoded = abi::encode(&[
            Token::FixedBytes(keccak256(self.pack()).to_vec()),
            Token::Address(entry_point),
            Token::Uint(U256::from(chain_id)),
        ]);
        H256::from(keccak256(encoded))
    }
}

/// Bytes of [DUMMY_SIGNATURE](crate::consts::DUMMY_SIGNATURE)
pub fn dummy_signature() -> Bytes {
    decode_hex_const(DUMMY_SIGNATURE)
}

pub(crate) fn decode_hex_const(value: &str) -> Bytes {
    // constants are valid hex; an empty value would only be produced by a typo
    value.parse::<Bytes>().unwrap_or_default()
}

/// Answer to `eth_getUserOperationReceipt`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    pub user_op_hash: UserOperationHash,
    pub entry_point: Address,
    pub sender: Address,
    pub nonce: U256,
    #[serde(default)]
    pub paymaster: Option<Address>,
    pub actual_gas_cost: U256,
    pub actual_gas_used: U256,
    pub success: bool,
    #[serde(default)]
    pub reason: Option<String>,
    pub logs: Vec<Log>,
    pub receipt: TransactionReceipt,
}

/// A smart contract account bound to an owner key on one chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartAccountHandle {
    /// Counterfactual (or deployed) account address
    pub address: Address,
    /// Owner key allowed to sign for the account
    pub owner: Owner,
    pub chain_id: u64,
    /// Account factory used to derive the address
    pub factory: Address,
    /// `factory ++ createAccount(owner, index)` while the account is not deployed
    pub init_code: Option<Bytes>,
    pub deployed: bool,
}

impl SmartAccountHandle {
    /// Init code to put in the next user operation
    pub fn init_code(&self) -> Bytes {
        match (&self.init_code, self.deployed) {
            (Some(code), false) => code.clone(),
            _ => Bytes::default(),
        }
    }
}

/// A coin deployment as the user asks for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRequest {
    pub name: String,
    pub symbol: String,
    #[serde(rename = "metadataURI")]
    pub metadata_uri: String,
    #[serde(default)]
    pub platform_referrer: Option<Address>,
}

impl DeploymentRequest {
    pub fn new(name: &str, symbol: &str, metadata_uri: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            metadata_uri: metadata_uri.to_string(),
            platform_referrer: None,
        }
    }

    pub fn with_platform_referrer(mut self, referrer: Address) -> Self {
        self.platform_referrer = Some(referrer);
        self
    }

    /// Client-side listing policy, stricter than the factory: a non-blank name,
    /// a symbol of 1 to 11 ASCII letters or digits, and an `ipfs://`, `https://`
    /// or `ar://` metadata locator. The factory itself takes any strings.
    pub fn validate(&self) -> Result<(), CoinOpError> {
        static SYMBOL: OnceLock<Regex> = OnceLock::new();
        static URI: OnceLock<Regex> = OnceLock::new();
        let symbol_re =
            SYMBOL.get_or_init(|| Regex::new(r"^[A-Za-z0-9]{1,11}$").expect("valid regex"));
        let uri_re =
            URI.get_or_init(|| Regex::new(r"^(ipfs|https|ar)://\S+$").expect("valid regex"));

        if self.name.trim().is_empty() {
            return Err(CoinOpError::InvalidRequest("name is empty".to_string()));
        }
        if !symbol_re.is_match(&self.symbol) {
            return Err(CoinOpError::InvalidRequest(format!(
                "symbol {:?} must be 1 to 11 letters or digits",
                self.symbol
            )));
        }
        if !uri_re.is_match(&self.metadata_uri) {
            return Err(CoinOpError::InvalidRequest(format!(
                "metadata uri {:?} must be an ipfs://, https:// or ar:// locator",
                self.metadata_uri
            )));
        }
        Ok(())
    }
}

/// A submitted user operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionHandle {
    pub user_op_hash: UserOperationHash,
    pub chain_id: u64,
    /// Smart account that sent the operation
    pub sender: Address,
    pub entry_point: Address,
    /// Factory the operation calls
    pub factory: Address,
    pub salt: H256,
}

/// A confirmed coin deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    pub user_op_hash: UserOperationHash,
    pub transaction_hash: H256,
    /// Deployed coin contract
    pub address: Address,
    /// Block timestamp, unix seconds
    pub confirmed_at: u64,
    pub chain_id: u64,
    pub smart_account_address: Address,
}
