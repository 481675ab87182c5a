//! Off-chain encoding and signing for the recipe automation engine.

pub mod encoder;
pub mod facts;
pub mod types;


pub use encoder::{
    address_of, encode_envelope, encode_recipe, relay_digest, sign_envelope, signing_key_from_hex,
};
pub use facts::MockFacts;
pub use types::{EncodeError, RelayEnvelope};
