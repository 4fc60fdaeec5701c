//! Word-level primitives for the LC-3.
//!
//! This module provides the pure helpers the rest of the emulator builds on:
//! - [`swap16`] - byte order conversion for object images
//! - [`sign_extend`] - widening of signed instruction fields
//! - [`ConditionCode`] - the N/Z/P flags held in the PSR

pub mod arith;
mod cond;

pub use arith::{sign_extend, swap16};
pub use cond::ConditionCode;
