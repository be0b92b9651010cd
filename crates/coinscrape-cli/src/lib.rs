//! Process-level pieces of the `coinscrape` binary: renderer selection,
//! logging, output, history, and environment checks.

pub mod browser;
pub mod doctor;
pub mod history;
pub mod logging;
pub mod output;
