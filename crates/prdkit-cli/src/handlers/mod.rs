//! Command handlers.
//!
//! Each handler is a thin wrapper: turn CLI input into library calls and
//! format the result for the terminal.

pub mod diagnose;
pub mod prompt;
pub mod serve;
