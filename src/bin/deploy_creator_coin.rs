use clap::{value_parser, Parser, Subcommand};
use creator_coin_userop::{
    config::{CoinOpConfig, Network, NetworkPreference},
    consts::SEED_PHRASE,
    deployer::CoinDeployer,
    session::SessionContext,
    types::DeploymentRequest,
    utils::owner_wallet,
};
use dotenv::dotenv;
use ethers::types::Address;
use std::{path::PathBuf, sync::Arc};
use tracing::{info, Level};

#[derive(Debug, Parser)]
#[clap(name = "deploy-creator-coin")]
pub struct Opts {
    #[clap(subcommand)]
    pub sub: Subcommands,

    /// JSON config file. Defaults and environment variables are used without it.
    #[clap(long, short, global = true)]
    config: Option<PathBuf>,

    /// Network to use instead of the saved preference
    #[clap(long, short, global = true, value_enum)]
    network: Option<Network>,

    /// Hex private key of the owner. The test seed phrase is used without it.
    #[clap(long, global = true, env = "OWNER_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// The verbosity level
    #[clap(long, short, global = true, default_value_t = 2, value_parser = value_parser!(u8).range(..=4))]
    verbosity: u8,
}

impl Opts {
    fn log_level(&self) -> Level {
        match self.verbosity {
            0 => Level::ERROR,
            1 => Level::WARN,
            2 => Level::INFO,
            3 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Subcommands {
    /// Deploy a creator coin from the owner's smart account
    #[clap(visible_alias = "d")]
    Deploy {
        #[clap(long)]
        name: String,
        #[clap(long)]
        symbol: String,
        /// ipfs://, https:// or ar:// metadata locator
        #[clap(long)]
        uri: String,
        #[clap(long)]
        referrer: Option<Address>,
    },
    /// Print the owner's smart account
    #[clap(visible_alias = "a")]
    Account,
    /// Show or save the network preference
    #[clap(visible_alias = "n")]
    Network {
        #[clap(value_enum)]
        set: Option<Network>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let opts = Opts::parse();
    tracing_subscriber::fmt()
        .with_max_level(opts.log_level())
        .init();

    let preference = NetworkPreference::default_location()?;
    if let Subcommands::Network { set } = &opts.sub {
        match set {
            Some(network) => {
                preference.save(*network)?;
                println!("saved {network:?} to {}", preference.path().display());
            }
            None => println!("{:?}", preference.load()?),
        }
        return Ok(());
    }

    let config = match &opts.config {
        Some(path) => CoinOpConfig::from_file(path)?,
        None => CoinOpConfig::from_env()?,
    };
    let network = match opts.network {
        Some(network) => network,
        None => preference.load()?,
    };
    let wallet = owner_wallet(opts.private_key.as_deref(), SEED_PHRASE)?;
    let deployer = CoinDeployer::connect(&config, network).await?;
    let session = SessionContext::new(Arc::new(wallet), deployer.network().clone());

    match opts.sub {
        Subcommands::Deploy {
            name,
            symbol,
            uri,
            referrer,
        } => {
            let mut request = DeploymentRequest::new(&name, &symbol, &uri);
            if let Some(referrer) = referrer {
                request = request.with_platform_referrer(referrer);
            }
            let result = deployer.deploy(&session, &request).await?;
            info!(coin = ?result.address, "deployed");
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Subcommands::Account => {
            match deployer.provisioner().ensure_account(&session).await? {
                Some(account) => println!(
                    "smart account {:?} (owner {:?}, deployed: {})",
                    account.address, account.owner.address, account.deployed
                ),
                None => println!("wallet has no account yet"),
            }
        }
        Subcommands::Network { .. } => {}
    }
    Ok(())
}
