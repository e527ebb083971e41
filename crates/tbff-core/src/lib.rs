//! # tbff-core
//! Foundation types and traits for the TBFF flow network.

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;
pub mod validation;
