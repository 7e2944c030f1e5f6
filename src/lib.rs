// Crate root: declare modules and control visibility
pub mod cli;
pub mod map_parser;
pub mod report;

// Re-export the parser API for the binary and tests
pub use map_parser::{parse_map_file, scan_bss, BssSymbol, MapError, MapReport};
