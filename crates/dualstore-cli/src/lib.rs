//! Dualstore CLI
//!
//! Operator surface over a phase file and a JSONL diff log.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cli;
pub mod commands;

pub use cli::Cli;
pub use commands::run;
