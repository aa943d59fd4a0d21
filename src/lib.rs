//! Patient Records Library
//!
//! This library provides an in-memory store of patient records backed by a CSV
//! file. It includes modules for CSV parsing and serialization, the ordered
//! record store, the command interface used by front ends, CLI argument
//! parsing, and the interactive shell.

pub mod cli;
pub mod commands;
pub mod csv_handler;
pub mod error;
pub mod render;
pub mod shell;
pub mod store;
