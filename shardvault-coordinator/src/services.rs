//! Internal services of the coordinator.
//!
//! - [`database`] – thin sled wrapper storing JSON documents per collection.
//! - [`keystore`] – PEM persistence of the coordinator's SM2 keypair.
//! - [`registry`] – the `servers` collection and node selection.
//! - [`users`] – the `users` collection.
//! - [`files`] – the `files` collection with blob offload for large bodies.
//! - [`dealer`] – upload-time share dealing, signcryption and fan-out.
//! - [`broadcast`] – parallel HTTP fan-out to storage nodes.
//! - [`rate_limit`] – fixed-window per-address request limiting.

pub(crate) mod broadcast;
pub(crate) mod database;
pub(crate) mod dealer;
pub(crate) mod files;
pub(crate) mod keystore;
pub(crate) mod rate_limit;
pub(crate) mod registry;
pub(crate) mod users;
