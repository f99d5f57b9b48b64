//! Small, self-contained primitives used across the solver.
//!
//! `stdx` hosts allocation-free utilities tuned for the search hot loop
//! rather than general-purpose ergonomics. Everything here is `Copy` or
//! inline-storage, with deterministic behavior suitable for reuse in
//! tight loops.

pub mod bitset128;

pub use bitset128::BitSet128;
