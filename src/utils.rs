use ethers::signers::{coins_bip39::English, LocalWallet, MnemonicBuilder};

/// Given a seed phrase, build the owner wallet at the first derivation index
///
/// # Arguments
/// * `seed` - The seed phrase
///
/// # Returns
/// * `LocalWallet` - The wallet
pub fn build_wallet(seed: &str) -> anyhow::Result<LocalWallet> {
    let wallet = MnemonicBuilder::<English>::default().phrase(seed).build()?;
    Ok(wallet)
}

/// Owner wallet from a hex private key if one is given, otherwise from `seed`
pub fn owner_wallet(private_key: Option<&str>, seed: &str) -> anyhow::Result<LocalWallet> {
    match private_key {
        Some(key) => Ok(key.trim_start_matches("0x").parse::<LocalWallet>()?),
        None => build_wallet(seed),
    }
}
