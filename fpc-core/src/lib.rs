#![cfg_attr(not(test), no_std)]

// Electrical control plane for the FPC1020 fingerprint sensor.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library and exposing traits for every platform collaborator.

// Must stay first so the logging macros are visible to every other module.
mod fmt;

pub mod attrs;
pub mod controller;
pub mod error;
pub mod gate;
pub mod pins;
pub mod rails;
pub mod sequences;
pub mod telemetry;
pub mod wake;

pub use controller::{Board, BoardConfig, BoardResources, FpcController, ResourceProvider, probe};
pub use error::{Error, Handle, HwError, ResolveError};
