/// In most smart contract account implementations the signature field is computed off-chain by hashing a user operation and signing that hash using some signature scheme
/// This signature must be computed after gas is estimated, as those fields are included in the hash. However, there are portions of the gas estimation step that require the signature field to be populated: preVerificationGas and verificationGasLimit.
/// To get around this, we use a dummy signature that is the same length as a real signature, but is not a valid signature. This allows us to compute the gas estimation for `preVerificationGas` and `verificationGasLimit` without real signature.
/// See https://www.alchemy.com/blog/dummy-signatures-and-gas-token-transfers
pub const DUMMY_PAYMASTER_AND_DATA: &str = "0xC03Aac639Bb21233e0139381970328dB8bcEeB67fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff0000000000000000000000000000000007aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1c";
pub const DUMMY_SIGNATURE: &str = "0xfffffffffffffffffffffffffffffff0000000000000000000000000000000007aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1c";

/// Entry point contract address. All entry point contracts have the same address
pub const ENTRY_POINT_ADDRESS: &str = "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789";
/// Simple account factory, deployed at the same address on Base and Base Sepolia
pub const SIMPLE_ACCOUNT_FACTORY: &str = "0x9406Cc6185a346906296840746125a0E44976454";
/// Creator coin factory, deployed at the same address on Base and Base Sepolia
pub const CREATOR_COIN_FACTORY: &str = "0x777777751622c0d3258f214F9DF38E35BF45baF3";
/// Index passed to `createAccount`/`getAddress`. One smart account per owner.
pub const ACCOUNT_INDEX: u64 = 0;
/// Test Key phrase
pub const SEED_PHRASE: &str = "test test test test test test test test test test test junk";

/// Base mainnet chain id
pub const BASE_CHAIN_ID: u64 = 8453;
/// Base Sepolia chain id
pub const BASE_SEPOLIA_CHAIN_ID: u64 = 84532;
/// Public Base mainnet RPC
pub const BASE_RPC_URL: &str = "https://mainnet.base.org";
/// Public Base Sepolia RPC
pub const BASE_SEPOLIA_RPC_URL: &str = "https://sepolia.base.org";

/// Pool config layout version understood by the factory for native-asset-paired coins
pub const POOL_CONFIG_VERSION: u8 = 4;
/// Lower tick of the single discovery position
pub const POOL_TICK_LOWER: i32 = -887220;
/// Upper tick of the single discovery position
pub const POOL_TICK_UPPER: i32 = 887220;
/// Number of discovery positions
pub const POOL_NUM_DISCOVERY_POSITIONS: u16 = 1;
/// Share of supply in discovery positions, 1e18 = 100%
pub const POOL_MAX_DISCOVERY_SUPPLY_SHARE: u64 = 1_000_000_000_000_000_000;

/// Added to the bundler's preVerificationGas estimate
pub const PRE_VERIFICATION_GAS_BUFFER: u64 = 1000;
/// The bundler's callGasLimit estimate is multiplied by this
pub const CALL_GAS_MULTIPLIER: u64 = 2;

/// Default delay before the automatic provisioning retry, in milliseconds
pub const PROVISION_RETRY_DELAY_MS: u64 = 2000;
/// Default confirmation window, in seconds
pub const CONFIRMATION_TIMEOUT_SECS: u64 = 120;
/// Default receipt polling interval, in milliseconds
pub const CONFIRMATION_POLL_MS: u64 = 2000;

/// Creation event of the current coin factory. The pool key is
/// `(currency0, currency1, fee, tickSpacing, hooks)`.
pub const COIN_CREATED_V4_EVENT: &str = "CoinCreatedV4(address,address,address,address,string,string,string,address,(address,address,uint24,int24,address),bytes32,string)";
/// Creation event of factories that predate hook pools
pub const COIN_CREATED_EVENT: &str =
    "CoinCreated(address,address,address,address,string,string,string,address,address,string)";
