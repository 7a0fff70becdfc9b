//! Internal services of a storage node.
//!
//! - [`share_store`] – the node-local collection of signcrypted shares.
//! - [`keystore`] – PEM key material and `info.json` under the storage dir.
//! - [`enrol`] – parameter bootstrap and registration at the coordinator.

pub(crate) mod enrol;
pub(crate) mod keystore;
pub(crate) mod share_store;
