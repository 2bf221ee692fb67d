//! HTTP request handlers.
//!
//! This module contains the encode and decode endpoint handlers.

pub mod codec;
