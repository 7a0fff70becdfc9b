#![deny(missing_docs)]
//! Shared types for the shardvault protocol.
//!
//! This crate defines everything the coordinator, the storage nodes and the
//! client exchange or persist:
//!
//! - the immutable [`params::SystemParameters`] document served to joiners
//! - the request/response payloads of every HTTP route ([`api::v1`])
//! - the standard response envelope and the stable error-code table
//!   ([`api::envelope`], [`api::error_codes`])
//! - the documents stored in the coordinator and node databases
//!   ([`records`])
//!
//! Big integers cross the wire in the canonical grouped-hex encoding of
//! [`shardvault_core::codec`]; curve points as `[x, y]` arrays or `null`.

pub mod api;
pub mod params;
pub mod records;
