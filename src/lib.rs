//! portsnare - a low-interaction deception listener.
//!
//! The capture side opens TCP listeners on a set of service ports, greets
//! each peer with a protocol-appropriate banner, records everything
//! received to an append-only JSONL file, and answers every chunk with a
//! canned rejection. The analysis side streams that file later and prints
//! attacker-behavior statistics.

pub mod analysis;
pub mod config;
pub mod handlers;
pub mod store;
