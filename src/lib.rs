pub mod chain;
pub mod config;
pub mod consts;
pub mod deployer;
pub mod errors;
pub mod gen;
pub mod provisioner;
pub mod relay;
pub mod salt;
pub mod session;
pub mod signer;
pub mod submitter;
pub mod traits;
pub mod types;
pub mod utils;
pub mod watcher;

#[cfg(test)]
mod testing;

pub use deployer::CoinDeployer;
pub use errors::CoinOpError;
pub use provisioner::SmartAccountProvisioner;
