//! HTTP inbound adapter exposing REST endpoints.

pub mod health;
