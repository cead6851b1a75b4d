//! # Ledger Primitives
//!
//! Hardcoded runtime constants for the stakeledger CORE.
//!
//! These are compiled into the binary and are immutable at runtime:
//! - Binary framing for snapshots and fixture checkpoints
//! - Address derivation labels
//! - Test-asset fixture parameters (supply, metadata)
//! - Input validation limits

use crate::types::{Amount, TokenId};

// =============================================================================
// BINARY FORMAT
// =============================================================================

/// Magic bytes for the stakeledger binary format header.
///
/// - File Header = Magic Bytes ("STKL") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"STKL";

/// Current serialization format version.
///
/// Increment this when making breaking changes to the serialization format.
pub const FORMAT_VERSION: u8 = 1;

/// Length of the framing header (magic + version).
pub const HEADER_LEN: usize = 5;

/// Maximum framed payload accepted by the decoder (64 MiB).
pub const MAX_FRAMED_SIZE: usize = 64 * 1024 * 1024;

// =============================================================================
// ADDRESS DERIVATION
// =============================================================================

/// Domain tag mixed into every derived address.
pub const ADDRESS_DOMAIN: &[u8] = b"stakeledger/address/v1";

/// Label for the ledger's custody account.
pub const CUSTODY_LABEL: &str = "custody";

/// Label for the fungible fixture's address.
pub const FUNGIBLE_LABEL: &str = "fungible-asset";

/// Label for the multi-identifier fixture's address.
pub const MULTI_TOKEN_LABEL: &str = "multi-asset";

// =============================================================================
// TEST-ASSET FIXTURES
// =============================================================================

/// Decimal places of the fungible fixture.
pub const TOKEN_DECIMALS: u8 = 18;

/// One whole token in base units (10^18).
pub const ONE_TOKEN: Amount = 1_000_000_000_000_000_000;

/// Supply minted to the deployer of either fixture: one billion whole tokens.
pub const INITIAL_SUPPLY: Amount = 1_000_000_000 * ONE_TOKEN;

/// Display name of the fungible fixture.
pub const FUNGIBLE_NAME: &str = "ERC20 MockToken";

/// Ticker of the fungible fixture.
pub const FUNGIBLE_SYMBOL: &str = "MockToken";

/// Metadata URI template of the multi-identifier fixture.
///
/// Clients substitute `{id}` themselves; the fixture returns the template verbatim.
pub const MULTI_TOKEN_URI: &str = "https://api.mysite.com/tokens/{id}";

/// Identifier minted in bulk at deployment.
pub const PRIMARY_TOKEN_ID: TokenId = TokenId(1);

/// Identifier minted as a single item at deployment.
pub const COLLECTIBLE_TOKEN_ID: TokenId = TokenId(2);

/// Quantity of the collectible minted at deployment.
pub const COLLECTIBLE_SUPPLY: Amount = 1;

// =============================================================================
// STORAGE KEYS
// =============================================================================

/// Blob slot holding the framed state of both test-asset fixtures.
pub const FIXTURE_BLOB_KEY: &str = "fixtures";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum number of entries in a batch mint.
pub const MAX_BATCH_LENGTH: usize = 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"STKL");
        assert_eq!(HEADER_LEN, MAGIC_BYTES.len() + 1);
    }

    #[test]
    fn initial_supply_is_one_billion_tokens() {
        assert_eq!(ONE_TOKEN, 10u128.pow(u32::from(TOKEN_DECIMALS)));
        assert_eq!(INITIAL_SUPPLY / ONE_TOKEN, 1_000_000_000);
    }
}
