//! iOS Trace Studio
//!
//! Profiling sessions and trace analysis for iOS apps, driven through
//! `xcrun xctrace`.
//!
//! This crate provides the core implementation for the `ios-trace` CLI:
//! starting and stopping recordings against a booted simulator or device,
//! and turning the resulting trace bundles into compact CPU, memory and
//! leak summaries.
//!
//! ## Getting Started
//!
//! ```bash
//! cargo install ios-trace-studio
//! ios-trace --help
//! ```
//!
//! Agents talk to a long-running `ios-trace serve` over JSON lines; one-off
//! analysis of an existing bundle is `ios-trace analyze --trace <path>`.

pub mod aggregator;
pub mod commands;
pub mod output;
pub mod parser;
pub mod preflight;
pub mod retention;
pub mod server;
pub mod session;
pub mod supervisor;
pub mod utils;
pub mod xctrace;
