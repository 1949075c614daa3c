//! Postcode CLI Library
//!
//! This module exposes the cache, postcode client and CLI modules for use in
//! integration tests and as a library.

pub mod cache;
pub mod cli;
pub mod postcodes;
