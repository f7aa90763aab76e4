//! # Early Drivers

pub mod console;

pub use console::ConsoleLogger;
