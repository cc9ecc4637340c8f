//! Input discovery

pub mod scanner;

pub use scanner::{collect, scan, DiscoveredFile};
