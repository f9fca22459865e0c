//! # tarih-cli
//!
//! Command-line front end for [`tarih_rag`]: build the index from a corpus
//! directory, answer one-off questions, run an interactive session and
//! inspect index statistics.
//!
//! The binary is `tarih`; this library holds argument parsing, provider
//! selection and command bodies so they can be tested without a terminal.

pub mod cli;
pub mod commands;
pub mod providers;
pub mod repl;
pub mod telemetry;

pub use cli::{Cli, Command, EmbedderKind, GeneratorKind, LogFormat};
