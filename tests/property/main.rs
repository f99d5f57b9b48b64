//! Property-based soundness tests.
//!
//! Run with: `cargo test --test property`

mod bitset_algebra;
mod search_invariants;
mod solver_soundness;
mod wire_roundtrip;
