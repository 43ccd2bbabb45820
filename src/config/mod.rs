//! Configuration management
//!
//! The difficulty, genesis reward, address version byte and on-disk
//! locations are carried in an explicit [`Config`] value that callers pass to
//! the chain store and wallet layer at construction time.

pub mod settings;

pub use settings::{Config, CONFIG_PATH_ENV};
