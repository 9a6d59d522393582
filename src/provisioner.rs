use crate::{
    config::RetryPolicy,
    consts::ACCOUNT_INDEX,
    errors::CoinOpError,
    gen::CreateAccountCall,
    session::SessionContext,
    signer::{Owner, Resolution, SignerResolver},
    traits::{AccountBuilder, ChainReader},
    types::SmartAccountHandle,
};
use async_trait::async_trait;
use ethers::{
    abi::AbiEncode,
    types::{Address, Bytes, U256},
};
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

/// `factory ++ createAccount(owner, index)`
pub fn account_init_code(factory: Address, owner: Address, index: U256) -> Bytes {
    let mut init_code = factory.as_bytes().to_vec();
    init_code.extend(CreateAccountCall { owner, salt: index }.encode());
    Bytes::from(init_code)
}

/// Builds SimpleAccount handles from the account factory's counterfactual address
#[derive(Debug, Clone)]
pub struct SimpleAccountBuilder {
    chain: Arc<dyn ChainReader>,
    /// The smart contract wallet factory contract address
    factory: Address,
    index: U256,
}

impl SimpleAccountBuilder {
    pub fn new(chain: Arc<dyn ChainReader>, factory: Address) -> Self {
        Self {
            chain,
            factory,
            index: U256::from(ACCOUNT_INDEX),
        }
    }
}

#[async_trait]
impl AccountBuilder for SimpleAccountBuilder {
    async fn build(&self, owner: &Owner, chain_id: u64) -> anyhow::Result<SmartAccountHandle> {
        let address = self
            .chain
            .account_address(self.factory, owner.address, self.index)
            .await?;
        let deployed = !self.chain.code(address).await?.is_empty();
        debug!(account = ?address, deployed, "resolved smart account");

        Ok(SmartAccountHandle {
            address,
            owner: owner.clone(),
            chain_id,
            factory: self.factory,
            init_code: (!deployed)
                .then(|| account_init_code(self.factory, owner.address, self.index)),
            deployed,
        })
    }
}

/// Provisioning state of the session's smart account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionState {
    Idle,
    WaitingForSigner,
    Initializing { attempt: u32 },
    Ready(Address),
    Failed { attempt: u32, reason: String },
}

type AccountKey = (Address, u64);
type Outcome = Result<SmartAccountHandle, CoinOpError>;

struct InFlight {
    id: u64,
    rx: watch::Receiver<Option<Outcome>>,
}

enum Role {
    Leader(watch::Sender<Option<Outcome>>),
    Waiter(u64, watch::Receiver<Option<Outcome>>),
}

/// Produces one smart account per owner and chain.
///
/// Concurrent callers share a single in-flight construction. A failed
/// construction is retried according to the [RetryPolicy]; once the retries are
/// spent the failure is returned to every waiter and the next call starts over.
pub struct SmartAccountProvisioner {
    builder: Arc<dyn AccountBuilder>,
    resolver: SignerResolver,
    retry: RetryPolicy,
    cache: Mutex<HashMap<AccountKey, SmartAccountHandle>>,
    in_flight: Mutex<HashMap<AccountKey, InFlight>>,
    next_id: AtomicU64,
    state: Mutex<ProvisionState>,
    events: broadcast::Sender<ProvisionState>,
}

impl std::fmt::Debug for SmartAccountProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartAccountProvisioner")
            .field("builder", &self.builder)
            .field("retry", &self.retry)
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl SmartAccountProvisioner {
    pub fn new(builder: Arc<dyn AccountBuilder>, retry: RetryPolicy) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            builder,
            resolver: SignerResolver,
            retry,
            cache: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            state: Mutex::new(ProvisionState::Idle),
            events,
        }
    }

    pub fn state(&self) -> ProvisionState {
        self.state.lock().clone()
    }

    /// Receives every state transition from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ProvisionState> {
        self.events.subscribe()
    }

    /// Drops every cached account, e.g. on logout
    pub fn reset(&self) {
        self.cache.lock().clear();
        self.transition(ProvisionState::Idle);
    }

    /// Returns the session's smart account.
    ///
    /// `Ok(None)` means the owner is logged in but the wallet has no account
    /// yet; call again once it has. Construction failures and a missing login
    /// are errors.
    pub async fn ensure_account(
        &self,
        session: &SessionContext,
    ) -> Result<Option<SmartAccountHandle>, CoinOpError> {
        let owner = match self.resolver.resolve(session).await {
            Resolution::NotAuthenticated => {
                self.transition(ProvisionState::Idle);
                return Err(CoinOpError::NotAuthenticated);
            }
            Resolution::Pending => {
                // a wallet blinking out does not undo a ready account
                self.transition_unless(ProvisionState::WaitingForSigner, |state| {
                    matches!(state, ProvisionState::Ready(_))
                });
                return Ok(None);
            }
            Resolution::Ready(owner) => owner,
        };
        let key = (owner.address, session.chain_id());

        loop {
            let role = {
                // in_flight before cache, in every path that takes both
                let mut in_flight = self.in_flight.lock();
                if let Some(handle) = self.cache.lock().get(&key) {
                    return Ok(Some(handle.clone()));
                }
                match in_flight.get(&key) {
                    Some(flight) => Role::Waiter(flight.id, flight.rx.clone()),
                    None => {
                        let (tx, rx) = watch::channel(None);
                        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                        in_flight.insert(key, InFlight { id, rx });
                        Role::Leader(tx)
                    }
                }
            };

            match role {
                Role::Leader(tx) => {
                    let outcome = self.construct(session, owner.clone()).await;
                    {
                        let mut in_flight = self.in_flight.lock();
                        if let Ok(handle) = &outcome {
                            self.cache.lock().insert(key, handle.clone());
                        }
                        in_flight.remove(&key);
                    }
                    tx.send_replace(Some(outcome.clone()));
                    return outcome.map(Some);
                }
                Role::Waiter(id, mut rx) => {
                    let outcome = rx
                        .wait_for(|outcome| outcome.is_some())
                        .await
                        .map(|outcome| (*outcome).clone());
                    match outcome {
                        Ok(Some(outcome)) => return outcome.map(Some),
                        // the leader was dropped before finishing
                        _ => {
                            let mut in_flight = self.in_flight.lock();
                            if in_flight.get(&key).map(|flight| flight.id) == Some(id) {
                                in_flight.remove(&key);
                            }
                        }
                    }
                }
            }
        }
    }

    async fn construct(&self, session: &SessionContext, mut owner: Owner) -> Outcome {
        let chain_id = session.chain_id();
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.transition(ProvisionState::Initializing { attempt });

            let err = match self.builder.build(&owner, chain_id).await {
                Ok(handle) => {
                    info!(
                        account = ?handle.address,
                        owner = ?owner.address,
                        chain_id,
                        deployed = handle.deployed,
                        "smart account ready"
                    );
                    self.transition(ProvisionState::Ready(handle.address));
                    return Ok(handle);
                }
                Err(err) => err,
            };

            let reason = format!("{err:#}");
            warn!(attempt, "smart account construction failed: {reason}");
            self.transition(ProvisionState::Failed {
                attempt,
                reason: reason.clone(),
            });
            if attempt > self.retry.max_retries {
                return Err(CoinOpError::AccountConstructionFailed(reason));
            }

            tokio::time::sleep(self.retry.backoff()).await;
            match self.resolver.resolve(session).await {
                Resolution::Ready(current) if current.address == owner.address => owner = current,
                _ => {
                    warn!("owner changed or signed out, not retrying");
                    return Err(CoinOpError::AccountConstructionFailed(reason));
                }
            }
        }
    }

    fn transition(&self, next: ProvisionState) {
        self.transition_unless(next, |_| false);
    }

    fn transition_unless(&self, next: ProvisionState, keep: impl Fn(&ProvisionState) -> bool) {
        let mut state = self.state.lock();
        if *state == next || keep(&state) {
            return;
        }
        debug!(from = ?*state, to = ?next, "provisioning transition");
        *state = next.clone();
        // no subscribers is fine
        let _ = self.events.send(next);
    }
}
