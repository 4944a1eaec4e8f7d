//! Domain types for TrendScan

pub mod bar;

pub use bar::{validate_series, Bar, BarError};
