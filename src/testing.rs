//! In-memory doubles of the wallet, chain, account builder and relay.

use crate::{
    consts::COIN_CREATED_V4_EVENT,
    errors::CoinOpError,
    signer::Owner,
    traits::{AccountBuilder, ChainReader, EmbeddedWallet, SponsorRelay},
    types::{
        EstimateResult, SmartAccountHandle, SponsorResult, UserOperation, UserOperationHash,
        UserOperationReceipt,
    },
};
use async_trait::async_trait;
use ethers::{
    signers::{LocalWallet, Signer},
    abi::{self, Token},
    types::{Address, Bytes, Log, Signature, TransactionReceipt, H256, U256, U64},
    utils::keccak256,
};
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

/// Deterministic smart account address for an owner on a chain
pub fn account_address_for(owner: Address, chain_id: u64) -> Address {
    let mut preimage = owner.as_bytes().to_vec();
    preimage.extend_from_slice(&chain_id.to_be_bytes());
    Address::from_slice(&keccak256(preimage)[12..])
}

#[derive(Debug, Default)]
pub struct MockWallet {
    accounts: Mutex<Vec<Address>>,
    signer: Option<LocalWallet>,
}

impl MockWallet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_account(address: Address) -> Self {
        let wallet = Self::default();
        wallet.add_account(address);
        wallet
    }

    pub fn from_wallet(signer: LocalWallet) -> Self {
        Self {
            accounts: Mutex::new(vec![signer.address()]),
            signer: Some(signer),
        }
    }

    pub fn add_account(&self, address: Address) {
        self.accounts.lock().push(address);
    }

    pub fn clear(&self) {
        self.accounts.lock().clear();
    }
}

#[async_trait]
impl EmbeddedWallet for MockWallet {
    async fn accounts(&self) -> anyhow::Result<Vec<Address>> {
        Ok(self.accounts.lock().clone())
    }

    async fn sign_message(&self, account: Address, message: &[u8]) -> anyhow::Result<Signature> {
        match &self.signer {
            Some(signer) if signer.address() == account => {
                Ok(Signer::sign_message(signer, message).await?)
            }
            _ => anyhow::bail!("no key for {account:?}"),
        }
    }
}

/// Builds handles at [account_address_for], failing the first `failures` calls
#[derive(Debug, Default)]
pub struct MockAccountBuilder {
    calls: AtomicUsize,
    failures: AtomicUsize,
    delay: Duration,
    deployed: bool,
    /// Emptied on every failure, to simulate the wallet going away
    drop_on_failure: Option<Arc<MockWallet>>,
}

impl MockAccountBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn deployed(mut self) -> Self {
        self.deployed = true;
        self
    }

    pub fn clearing_on_failure(mut self, wallet: Arc<MockWallet>) -> Self {
        self.drop_on_failure = Some(wallet);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountBuilder for MockAccountBuilder {
    async fn build(&self, owner: &Owner, chain_id: u64) -> anyhow::Result<SmartAccountHandle> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            if let Some(wallet) = &self.drop_on_failure {
                wallet.clear();
            }
            anyhow::bail!("account factory unreachable");
        }
        Ok(SmartAccountHandle {
            address: account_address_for(owner.address, chain_id),
            owner: owner.clone(),
            chain_id,
            factory: Address::repeat_byte(0xfa),
            init_code: (!self.deployed).then(|| Bytes::from(vec![0xfa; 24])),
            deployed: self.deployed,
        })
    }
}

#[derive(Debug)]
pub struct MockChain {
    pub chain_id: u64,
    pub code: Mutex<HashMap<Address, Bytes>>,
    pub receipts: Mutex<HashMap<H256, TransactionReceipt>>,
    pub block_timestamp: u64,
    pub nonce: U256,
}

impl MockChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            code: Mutex::new(HashMap::new()),
            receipts: Mutex::new(HashMap::new()),
            block_timestamp: 1_700_000_000,
            nonce: U256::zero(),
        }
    }

    pub fn set_code(&self, address: Address, code: Vec<u8>) {
        self.code.lock().insert(address, Bytes::from(code));
    }

    pub fn set_receipt(&self, receipt: TransactionReceipt) {
        self.receipts
            .lock()
            .insert(receipt.transaction_hash, receipt);
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn chain_id(&self) -> Result<u64, CoinOpError> {
        Ok(self.chain_id)
    }

    async fn balance(&self, _address: Address) -> Result<U256, CoinOpError> {
        Ok(U256::zero())
    }

    async fn code(&self, address: Address) -> Result<Bytes, CoinOpError> {
        Ok(self.code.lock().get(&address).cloned().unwrap_or_default())
    }

    async fn estimate_fees(&self) -> Result<(U256, U256), CoinOpError> {
        Ok((U256::from(2_000_000_000u64), U256::from(1_000_000u64)))
    }

    async fn transaction_receipt(
        &self,
        hash: H256,
    ) -> Result<Option<TransactionReceipt>, CoinOpError> {
        Ok(self.receipts.lock().get(&hash).cloned())
    }

    async fn block_timestamp(&self, _number: u64) -> Result<u64, CoinOpError> {
        Ok(self.block_timestamp)
    }

    async fn account_address(
        &self,
        _factory: Address,
        owner: Address,
        _index: U256,
    ) -> Result<Address, CoinOpError> {
        Ok(account_address_for(owner, self.chain_id))
    }

    async fn entry_point_nonce(
        &self,
        _entry_point: Address,
        _sender: Address,
    ) -> Result<U256, CoinOpError> {
        Ok(self.nonce)
    }
}

/// Records submitted operations and serves a receipt after `pending_polls` lookups
#[derive(Debug)]
pub struct MockRelay {
    pub sponsor_error: Mutex<Option<CoinOpError>>,
    pub send_error: Mutex<Option<CoinOpError>>,
    pub sent: Mutex<Vec<UserOperation>>,
    pub sponsored: Mutex<Vec<UserOperation>>,
    pub receipt: Mutex<Option<UserOperationReceipt>>,
    pub pending_polls: AtomicUsize,
    pub polls: AtomicUsize,
    pub entry_point: Address,
    pub chain_id: u64,
}

impl MockRelay {
    pub fn new(entry_point: Address, chain_id: u64) -> Self {
        Self {
            sponsor_error: Mutex::new(None),
            send_error: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            sponsored: Mutex::new(Vec::new()),
            receipt: Mutex::new(None),
            pending_polls: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            entry_point,
            chain_id,
        }
    }

    pub fn reject_send(&self, message: &str) {
        *self.send_error.lock() = Some(CoinOpError::SubmissionRejected {
            code: -32500,
            message: message.to_string(),
        });
    }

    pub fn set_receipt(&self, receipt: UserOperationReceipt) {
        *self.receipt.lock() = Some(receipt);
    }

    pub fn last_sent(&self) -> Option<UserOperation> {
        self.sent.lock().last().cloned()
    }
}

#[async_trait]
impl SponsorRelay for MockRelay {
    async fn estimate_user_operation_gas(
        &self,
        _user_operation: &UserOperation,
    ) -> Result<EstimateResult, CoinOpError> {
        Ok(EstimateResult {
            pre_verification_gas: U256::from(44_572u64),
            verification_gas_limit: U256::from(340_583u64),
            call_gas_limit: U256::from(21_797u64),
        })
    }

    async fn sponsor_user_operation(
        &self,
        user_operation: &UserOperation,
    ) -> Result<SponsorResult, CoinOpError> {
        if let Some(err) = self.sponsor_error.lock().clone() {
            return Err(err);
        }
        self.sponsored.lock().push(user_operation.clone());
        Ok(SponsorResult {
            paymaster_and_data: Bytes::from(vec![0x99; 20]),
            pre_verification_gas: None,
            verification_gas_limit: Some(U256::from(400_000u64)),
            call_gas_limit: None,
        })
    }

    async fn send_user_operation(
        &self,
        user_operation: &UserOperation,
    ) -> Result<UserOperationHash, CoinOpError> {
        if let Some(err) = self.send_error.lock().clone() {
            return Err(err);
        }
        self.sent.lock().push(user_operation.clone());
        Ok(user_operation.hash(self.entry_point, self.chain_id))
    }

    async fn user_operation_receipt(
        &self,
        _hash: UserOperationHash,
    ) -> Result<Option<UserOperationReceipt>, CoinOpError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let still_pending = self
            .pending_polls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if still_pending {
            return Ok(None);
        }
        Ok(self.receipt.lock().clone())
    }
}

pub fn log_from(address: Address) -> Log {
    Log {
        address,
        ..Default::default()
    }
}

/// `CoinCreatedV4` emitted by `factory` for a coin deployed by `caller`
pub fn coin_created_log(factory: Address, caller: Address, coin: Address) -> Log {
    let data = abi::encode(&[
        Token::Address(Address::zero()),
        Token::String("ipfs://QmTest".to_string()),
        Token::String("Test Coin".to_string()),
        Token::String("TST".to_string()),
        Token::Address(coin),
        Token::Tuple(vec![
            Token::Address(Address::zero()),
            Token::Address(coin),
            Token::Uint(U256::from(30_000u64)),
            Token::Int(U256::from(200u64)),
            Token::Address(Address::repeat_byte(0x40)),
        ]),
        Token::FixedBytes(vec![0x33; 32]),
        Token::String("4".to_string()),
    ]);
    Log {
        address: factory,
        topics: vec![
            H256::from(keccak256(COIN_CREATED_V4_EVENT)),
            H256::from(caller),
            H256::from(caller),
            H256::zero(),
        ],
        data: Bytes::from(data),
        ..Default::default()
    }
}

/// A mined user operation receipt carrying `logs`
pub fn user_operation_receipt(
    user_op_hash: H256,
    sender: Address,
    entry_point: Address,
    success: bool,
    logs: Vec<Log>,
) -> UserOperationReceipt {
    let receipt = TransactionReceipt {
        transaction_hash: H256::repeat_byte(0x7e),
        block_number: Some(U64::from(1234u64)),
        status: Some(U64::from(success as u64)),
        logs: logs.clone(),
        ..Default::default()
    };
    UserOperationReceipt {
        user_op_hash,
        entry_point,
        sender,
        nonce: U256::zero(),
        paymaster: Some(Address::repeat_byte(0x99)),
        actual_gas_cost: U256::from(1u64),
        actual_gas_used: U256::from(1u64),
        success,
        reason: (!success).then(|| "execution reverted".to_string()),
        logs,
        receipt,
    }
}
