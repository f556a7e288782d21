//! PocketBase outbound adapters.
//!
//! This module provides a thin HTTP implementation of the `PocketBaseApi`
//! port.

mod dto;
mod http_client;

pub use http_client::{PocketBaseHttpClient, PocketBaseHttpConfig};
