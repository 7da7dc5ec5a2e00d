pub mod config;
pub mod error;
pub mod index;
pub mod morphology;
pub mod persist;
pub mod search;
pub mod stats;
pub mod store;
pub mod text;
pub mod urls;

pub use error::{Error, Result};
pub use index::*;
