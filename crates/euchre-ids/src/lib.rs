//! Opaque identifier minting and reconnect-token signing for the
//! fun-euchre runtime.

pub mod id;
pub mod token;

pub use id::{DeterministicIdFactory, IdFactory, SecureIdFactory, is_valid_id};
pub use token::{
    DEV_SENTINEL_SECRET, ExpectedBinding, ParsedToken, ReconnectTokenManager, TokenClaims,
    TokenError,
};
