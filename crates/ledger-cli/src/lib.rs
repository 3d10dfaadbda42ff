//! Library side of the `ledger-mapper` binary: logging setup, delimited
//! input, the terminal confirmer and per-file reports.

pub mod input;
pub mod logging;
pub mod prompt;
pub mod report;
