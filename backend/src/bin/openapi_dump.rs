//! Print the OpenAPI document as JSON.

use pocketgate::doc::ApiDoc;
use utoipa::OpenApi;

fn main() -> std::io::Result<()> {
    let json = ApiDoc::openapi()
        .to_pretty_json()
        .map_err(|error| std::io::Error::other(format!("failed to render OpenAPI: {error}")))?;
    println!("{json}");
    Ok(())
}
