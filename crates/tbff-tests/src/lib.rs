//! Integration test suite for the TBFF flow engine.
//!
//! Runs the engine end to end on the sample scenarios, drives the overflow
//! sink through its lifecycle via caller edits, and checks the engine's
//! invariants on randomly generated networks.

pub mod helpers;
