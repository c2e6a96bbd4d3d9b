//! Temporal cost and price resolution for precast concrete pieces.
//!
//! This crate keeps time-versioned ledgers of material prices, monthly
//! process parameters and published piece prices per production zone, and
//! resolves them as of any date into a full cost breakdown of a piece.

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod models;
pub mod store;
