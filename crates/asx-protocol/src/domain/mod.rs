//! # Domain Layer
//!
//! Protocol logic with no I/O: wire types, header signing, freshness,
//! replay fingerprints and session decisions.

pub mod entities;
pub mod errors;
pub mod headers;
pub mod replay;
pub mod session;
pub mod signing;
