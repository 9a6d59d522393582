//! Contract bindings. Only the entry points the deployment flow touches are declared.

use ethers::contract::abigen;

abigen!(
    SimpleAccountFactory,
    r#"[
        function createAccount(address owner, uint256 salt) external returns (address)
        function getAddress(address owner, uint256 salt) external view returns (address)
    ]"#,
);

abigen!(
    SimpleAccount,
    r#"[
        function execute(address dest, uint256 value, bytes func) external
    ]"#,
);

abigen!(
    EntryPoint,
    r#"[
        function getNonce(address sender, uint192 key) external view returns (uint256)
    ]"#,
);

abigen!(
    CreatorCoinFactory,
    r#"[
        function deployCreatorCoin(address payoutRecipient, address[] owners, string uri, string name, string symbol, bytes poolConfig, address platformReferrer, bytes32 coinSalt) external returns (address)
    ]"#,
);

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::{
        abi::AbiEncode,
        types::{Address, Bytes, U256},
    };

    #[test]
    fn test_deploy_creator_coin_selector() {
        let call = DeployCreatorCoinCall {
            payout_recipient: Address::zero(),
            owners: vec![],
            uri: String::new(),
            name: String::new(),
            symbol: String::new(),
            pool_config: Bytes::default(),
            platform_referrer: Address::zero(),
            coin_salt: [0u8; 32],
        };
        let encoded = call.encode();
        let selector = ethers::utils::id(
            "deployCreatorCoin(address,address[],string,string,string,bytes,address,bytes32)",
        );
        assert_eq!(&encoded[..4], &selector[..]);
    }

    #[test]
    fn test_execute_selector() {
        let call = ExecuteCall {
            dest: Address::zero(),
            value: U256::zero(),
            func: Bytes::default(),
        };
        assert_eq!(
            &call.encode()[..4],
            &ethers::utils::id("execute(address,uint256,bytes)")[..]
        );
    }
}
