//! Loan amortization, rental ROI and property tax comparable tools behind a
//! terminal UI.

pub mod app;
pub mod chart;
pub mod comps;
pub mod config;
pub mod error;
pub mod export;
pub mod format;
pub mod history;
pub mod logging;
pub mod loan;
pub mod roi;
pub mod schedule;
pub mod ui;

pub use error::{Error, Result};
