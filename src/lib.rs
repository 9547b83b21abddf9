//! # Multi Link Library
//!
//! Receive-side decoder for multi-protocol RC module telemetry.
//!
//! This library classifies the raw serial byte stream coming back from an
//! external multi-protocol module, dispatches the framed packets it carries
//! (module status, channel data, protocol-specific telemetry), and keeps a
//! per-module view of link health and refresh timing.

pub mod config;
pub mod error;
pub mod logbook;
pub mod serial;
pub mod telemetry;
