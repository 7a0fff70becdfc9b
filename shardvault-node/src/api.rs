//! HTTP surface of a storage node.
//!
//! - [`shares`] – share intake, download re-encryption, deletion.
//! - [`info`] – version endpoint.
//! - [`errors`] – the handler error type and its envelope mapping.

pub(crate) mod errors;
pub(crate) mod info;
pub(crate) mod shares;
