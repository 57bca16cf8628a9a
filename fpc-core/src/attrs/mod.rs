//! Attribute surface shared between firmware consoles and the emulator.
//!
//! The catalog in [`catalog`] names every attribute, [`grammar`] parses the
//! written values and [`commands`] dispatches them to the controller.

pub mod catalog;
pub mod commands;
pub mod grammar;

pub use commands::{AttributeError, AttributeExecutor};
pub use grammar::{Command, ParseError, parse_store};
