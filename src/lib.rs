//! Typed bindings for the OCR offchain aggregator contracts, built on a
//! runtime contract binder over any blockchain backend.

pub mod bind;
pub mod config;
pub mod contracts;
pub mod ethereum;

pub use bind::{BoundContract, CallOpts, Error, FilterOpts, Result, TransactOpts, WatchOpts};
