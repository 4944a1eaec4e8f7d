//! Bar sources and symbol universes.

pub mod csv_file;
pub mod provider;
pub mod synthetic;
pub mod universe;

pub use csv_file::CsvProvider;
pub use provider::{BarProvider, DataError, MemoryProvider};
pub use synthetic::SyntheticProvider;
pub use universe::Universe;
