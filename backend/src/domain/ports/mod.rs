//! Domain ports for the hexagonal boundary.

mod fixture_pocketbase;
mod pocketbase_api;

pub use fixture_pocketbase::{FixtureCall, FixturePocketBase};
#[cfg(test)]
pub use pocketbase_api::MockPocketBaseApi;
pub use pocketbase_api::{ClientResponseError, HealthCheckResponse, PocketBaseApi};
