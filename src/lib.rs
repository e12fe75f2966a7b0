//! AgoraPass - Community Vouching Service
//!
//! Users authenticate with an embedded-wallet identity provider, keep a
//! profile in SQLite, and issue EAS-style delegated attestations
//! ("vouches") for each other under a per-season quota. External ticket
//! credentials can be linked to a profile (deduplicated by nullifier), and
//! a signed derived credential can be minted against the user's score.
//!
//! Key principles:
//! - External services (identity, relay, indexer, contract, issuance) sit
//!   behind trait seams with in-memory mocks
//! - Quota consumption is a single atomic conditional decrement
//! - Unknown on-chain quota is `None`, never zero

pub mod attestation;
pub mod identity;
pub mod season;
pub mod server;
pub mod store;
pub mod zupass;
