//! seatwatch - opera ticket monitor.
//!
//! Collects repertoire listings from Polish opera houses, keeps the
//! performances of chosen productions, checks their ticket pages for
//! adjacent free seats and notifies each new fact once.

pub mod aggregator;
pub mod checker;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod scrapers;
pub mod state;
pub mod utils;
