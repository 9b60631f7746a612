//! # catmend Common Library
//!
//! Shared code for the catmend tools including:
//! - Error types
//! - Configuration loading
//! - The MARC record model
//! - Streaming MARC-XML reader/writer

pub mod config;
pub mod error;
pub mod marc;

pub use error::{Error, Result};
pub use marc::{ControlField, DataField, Field, Record, Subfield};
