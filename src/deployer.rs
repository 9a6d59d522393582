use crate::{
    chain::ChainClient,
    config::{CoinOpConfig, ConfirmationConfig, Network, NetworkConfig},
    errors::CoinOpError,
    provisioner::{SimpleAccountBuilder, SmartAccountProvisioner},
    relay::PaymasterRelay,
    salt::{Clock, SaltDeriver, SystemClock},
    session::SessionContext,
    signer::{Resolution, SignerResolver},
    submitter::SponsoredSubmitter,
    traits::{ChainReader, SponsorRelay},
    types::{DeploymentRequest, DeploymentResult},
    watcher::ConfirmationWatcher,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Runs a coin deployment end to end: owner resolution, smart account
/// provisioning, sponsored submission and confirmation.
#[derive(Debug)]
pub struct CoinDeployer<C = SystemClock> {
    network: NetworkConfig,
    chain: Arc<dyn ChainReader>,
    provisioner: Arc<SmartAccountProvisioner>,
    submitter: SponsoredSubmitter,
    watcher: ConfirmationWatcher,
    salts: SaltDeriver<C>,
    resolver: SignerResolver,
}

impl CoinDeployer<SystemClock> {
    /// Wires the HTTP node, the paymaster relay and the account factory of `network`
    ///
    /// # Arguments
    /// * `config` - Endpoints of both networks, retry policy and confirmation window
    /// * `network` - The selected network
    ///
    /// # Returns
    /// * `CoinDeployer` - A deployer bound to the node's verified chain
    pub async fn connect(config: &CoinOpConfig, network: Network) -> Result<Self, CoinOpError> {
        let net = config.network(network).clone();
        net.validate(network)?;

        let client = ChainClient::from_url(&net.rpc_url)?;
        client.verify_chain(net.chain_id).await?;
        let chain: Arc<dyn ChainReader> = Arc::new(client);
        let relay: Arc<dyn SponsorRelay> = Arc::new(PaymasterRelay::new(
            net.paymaster_url.clone(),
            net.bundler_url().to_string(),
            net.entry_point,
        ));
        let builder = Arc::new(SimpleAccountBuilder::new(chain.clone(), net.account_factory));
        let provisioner = Arc::new(SmartAccountProvisioner::new(builder, config.provisioning));

        info!(?network, chain_id = net.chain_id, "connected coin deployer");
        Ok(Self::new(
            net,
            chain,
            relay,
            provisioner,
            config.confirmation,
            SaltDeriver::default(),
        ))
    }
}

impl<C: Clock> CoinDeployer<C> {
    pub fn new(
        network: NetworkConfig,
        chain: Arc<dyn ChainReader>,
        relay: Arc<dyn SponsorRelay>,
        provisioner: Arc<SmartAccountProvisioner>,
        confirmation: ConfirmationConfig,
        salts: SaltDeriver<C>,
    ) -> Self {
        Self {
            submitter: SponsoredSubmitter::new(chain.clone(), relay.clone(), network.clone()),
            watcher: ConfirmationWatcher::new(relay, chain.clone(), confirmation),
            network,
            chain,
            provisioner,
            salts,
            resolver: SignerResolver,
        }
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// Shared with the UI layer to observe provisioning state
    pub fn provisioner(&self) -> Arc<SmartAccountProvisioner> {
        self.provisioner.clone()
    }

    /// Deploys `request` from the session's smart account and waits for the coin
    pub async fn deploy(
        &self,
        session: &SessionContext,
        request: &DeploymentRequest,
    ) -> Result<DeploymentResult, CoinOpError> {
        request.validate()?;
        self.check_network(session).await?;

        let creator = match self.resolver.resolve(session).await {
            Resolution::NotAuthenticated => return Err(CoinOpError::NotAuthenticated),
            Resolution::Pending => return Err(CoinOpError::SignerUnavailable),
            Resolution::Ready(owner) => owner.address,
        };

        let (salt, account) = tokio::join!(
            async {
                self.salts.derive(
                    creator,
                    &request.name,
                    &request.symbol,
                    &request.metadata_uri,
                )
            },
            self.provisioner.ensure_account(session),
        );
        let account = account?.ok_or(CoinOpError::SignerUnavailable)?;
        info!(
            account = ?account.address,
            ?salt,
            symbol = %request.symbol,
            "deploying creator coin"
        );

        let handle = self.submitter.submit(&account, request, salt).await?;
        self.watcher.await_result(&handle).await
    }

    async fn check_network(&self, session: &SessionContext) -> Result<(), CoinOpError> {
        if session.chain_id() != self.network.chain_id {
            return Err(CoinOpError::Config(format!(
                "session is on chain {}, deployer targets {}",
                session.chain_id(),
                self.network.chain_id
            )));
        }
        let actual = self.chain.chain_id().await?;
        if actual != self.network.chain_id {
            warn!(actual, expected = self.network.chain_id, "rpc endpoint on the wrong chain");
            return Err(CoinOpError::Config(format!(
                "rpc endpoint serves chain {actual}, selected network expects {}",
                self.network.chain_id
            )));
        }
        Ok(())
    }
}
