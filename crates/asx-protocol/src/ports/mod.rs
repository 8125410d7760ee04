//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - **Inbound (Driving)**: API that the HTTP layer and applications use
//! - **Outbound (Driven)**: Dependencies the exchange needs

pub mod inbound;
pub mod outbound;
