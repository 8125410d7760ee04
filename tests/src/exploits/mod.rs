//! # Exploit Simulations
//!
//! Each module plays an attacker against a running service and checks that
//! the attack is refused, with the right status and without leaking which
//! check caught it.
//!
//! | Module | Attack |
//! |--------|--------|
//! | `replay` | Resending captured messages, concurrently or late; flooding the cache |
//! | `forgery` | Impersonation, unknown keys, spoofed sealed source, relaying |
//! | `tampering` | Altered ciphertext, paths and bodies, forged responses |

pub mod forgery;
pub mod tampering;
