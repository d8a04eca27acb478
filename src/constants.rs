//! Compiled-in parameters for the bridged call
//!
//! Deployment addresses and IDs for the testnet route this tool drives.
//! Endpoints and timing live in [`crate::config::Config`] instead.

use alloy::primitives::{address, b256, Address, FixedBytes, U256};
use alloy::sol_types::SolCall;

use crate::chain::TargetContract;

/// Bridge domain ID of the source chain
pub const SOURCE_DOMAIN_ID: u8 = 2;

/// Bridge domain ID of the destination chain
pub const DESTINATION_DOMAIN_ID: u8 = 3;

/// Resource handled by the permissionless generic handler
pub const RESOURCE_ID: FixedBytes<32> =
    b256!("0000000000000000000000000000000000000000000000000000000000000500");

/// Bridge contract on the source chain
pub const BRIDGE_ADDRESS: Address = address!("4cf326d3817558038d6befea1a5936e6bcff5a2e");

/// Fee handler router on the source chain
pub const FEE_HANDLER_ROUTER_ADDRESS: Address =
    address!("2aae3d1fa2a1c0c1a21ba2c4fd3b8a5c4e58b1c3");

/// Contract called on the destination chain
pub const TARGET_CONTRACT_ADDRESS: Address =
    address!("669f52487ffa6f9abf722082f735537a98ec0e4b");

/// Selector of `increment(address)` on the target contract
pub const TARGET_FUNCTION_SELECTOR: FixedBytes<4> =
    FixedBytes(TargetContract::incrementCall::SELECTOR);

/// Execution gas the destination handler may spend on the call
pub const MAX_FEE: U256 = U256::from_limbs([3_000_000, 0, 0, 0]);

pub const DEFAULT_SOURCE_RPC_URL: &str = "https://ethereum-sepolia-rpc.publicnode.com";
pub const DEFAULT_DESTINATION_RPC_URL: &str = "https://gnosis-chiado-rpc.publicnode.com";
pub const DEFAULT_STATUS_API_URL: &str = "https://api.test.buildwithsygma.com";
