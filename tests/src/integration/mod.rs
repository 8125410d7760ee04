//! # Integration Tests
//!
//! Full request/response exchanges through the node router, from the point
//! of view of a caller holding its own identity.

pub mod round_trip;
