pub mod analysis;
pub mod config;
pub mod criteria;
pub mod definition;
pub mod diagnostics;
pub mod elements;
pub mod error;
pub mod geometry;
pub mod scoring;
pub mod state;
pub mod util;
// cmd and reports belong to the binary.
