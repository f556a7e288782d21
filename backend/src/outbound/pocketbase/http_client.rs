//! Reqwest-backed PocketBase adapter.
//!
//! This adapter owns transport details only: endpoint paths, request bodies,
//! the health-check timeout, and mapping of HTTP failures into
//! [`ClientResponseError`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::dto::{
    AuthResponseDto, AuthWithPasswordDto, CreateAccountDto, ErrorBodyDto, RecordListDto,
};
use crate::domain::DEFAULT_CHECK_TIMEOUT;
use crate::domain::ports::{ClientResponseError, HealthCheckResponse, PocketBaseApi};
use crate::domain::{AuthSession, Credentials, SignUpCredentials, UserRecord};

const DEFAULT_USERS_COLLECTION: &str = "users";
const DEFAULT_USER_AGENT: &str = "pocketgate/0.1";

/// Collection and timeout settings for PocketBase requests.
pub struct PocketBaseHttpConfig {
    /// Auth collection that holds user accounts.
    pub users_collection: String,
    /// Bound on a single `GET /api/health` request.
    pub health_timeout: Duration,
    /// HTTP user-agent sent to PocketBase.
    pub user_agent: String,
}

impl Default for PocketBaseHttpConfig {
    fn default() -> Self {
        Self {
            users_collection: DEFAULT_USERS_COLLECTION.to_owned(),
            health_timeout: DEFAULT_CHECK_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

/// PocketBase adapter that talks to one backend instance over HTTP.
pub struct PocketBaseHttpClient {
    client: Client,
    base_url: Url,
    users_collection: String,
    health_timeout: Duration,
}

impl PocketBaseHttpClient {
    /// Build an adapter for `base_url` with the default collection and timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: Url) -> Result<Self, reqwest::Error> {
        Self::with_config(base_url, PocketBaseHttpConfig::default())
    }

    /// Build an adapter with an explicit collection and health timeout.
    ///
    /// Only health checks are time-bounded; sign-in and sign-up requests wait
    /// for the backend.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_config(base_url: Url, config: PocketBaseHttpConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(config.user_agent).build()?;
        Ok(Self {
            client,
            base_url,
            users_collection: config.users_collection,
            health_timeout: config.health_timeout,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        join_endpoint(&self.base_url, path)
    }

    fn collection_endpoint(&self, action: &str) -> String {
        self.endpoint(&format!(
            "api/collections/{}/{action}",
            self.users_collection
        ))
    }
}

#[async_trait]
impl PocketBaseApi for PocketBaseHttpClient {
    fn base_url(&self) -> String {
        self.base_url.as_str().trim_end_matches('/').to_owned()
    }

    async fn create_account(
        &self,
        account: &SignUpCredentials,
    ) -> Result<UserRecord, ClientResponseError> {
        let url = self.collection_endpoint("records");
        let request = self
            .client
            .post(url.as_str())
            .json(&CreateAccountDto::from(account));
        send_json(request, &url).await
    }

    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthSession, ClientResponseError> {
        let url = self.collection_endpoint("auth-with-password");
        let request = self
            .client
            .post(url.as_str())
            .json(&AuthWithPasswordDto::from(credentials));
        send_json::<AuthResponseDto>(request, &url)
            .await
            .map(AuthResponseDto::into_session)
    }

    async fn refresh_auth(&self, token: &str) -> Result<AuthSession, ClientResponseError> {
        let url = self.collection_endpoint("auth-refresh");
        let request = self.client.post(url.as_str()).header(AUTHORIZATION, token);
        send_json::<AuthResponseDto>(request, &url)
            .await
            .map(AuthResponseDto::into_session)
    }

    async fn check_health(&self) -> Result<HealthCheckResponse, ClientResponseError> {
        let url = self.endpoint("api/health");
        let request = self
            .client
            .get(url.as_str())
            .timeout(self.health_timeout);
        let (status, body) = send(request, &url).await?;
        Ok(parse_health(status, &body))
    }

    async fn email_registered(&self, email: &str) -> Result<bool, ClientResponseError> {
        let url = self.collection_endpoint("records");
        let request = self.client.get(url.as_str()).query(&[
            ("filter", email_filter(email)),
            ("perPage", "1".to_owned()),
            ("skipTotal", "1".to_owned()),
        ]);
        let list: RecordListDto = send_json(request, &url).await?;
        Ok(!list.items.is_empty())
    }
}

async fn send(
    request: RequestBuilder,
    url: &str,
) -> Result<(StatusCode, Vec<u8>), ClientResponseError> {
    let response = request
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|error| map_transport_error(url, &error))?;
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|error| map_transport_error(url, &error))?;
    if !status.is_success() {
        debug!(url, status = status.as_u16(), "PocketBase request failed");
        return Err(map_status_error(url, status, body.as_ref()));
    }
    Ok((status, body.to_vec()))
}

async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    url: &str,
) -> Result<T, ClientResponseError> {
    let (_, body) = send(request, url).await?;
    serde_json::from_slice(&body).map_err(|error| {
        ClientResponseError::transport(url, format!("invalid PocketBase JSON payload: {error}"))
    })
}

/// Read a health body; anything unreadable reports code `0` so the monitor
/// treats it as unhealthy.
fn parse_health(status: StatusCode, body: &[u8]) -> HealthCheckResponse {
    serde_json::from_slice(body).unwrap_or_else(|_| HealthCheckResponse {
        code: 0,
        message: format!(
            "unreadable health payload (status {}): {}",
            status.as_u16(),
            body_preview(body)
        ),
    })
}

fn join_endpoint(base_url: &Url, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn email_filter(email: &str) -> String {
    let escaped = email.replace('\\', r"\\").replace('"', "\\\"");
    format!("email=\"{escaped}\"")
}

fn map_transport_error(url: &str, error: &reqwest::Error) -> ClientResponseError {
    if error.is_timeout() {
        ClientResponseError::aborted(url, error.to_string())
    } else {
        ClientResponseError::transport(url, error.to_string())
    }
}

fn map_status_error(url: &str, status: StatusCode, body: &[u8]) -> ClientResponseError {
    let error = ClientResponseError::new(url, status.as_u16());
    match serde_json::from_slice::<ErrorBodyDto>(body) {
        Ok(envelope) => error
            .with_message(envelope.message)
            .with_data(envelope.data),
        Err(_) => {
            let preview = body_preview(body);
            if preview.is_empty() {
                error
            } else {
                error.with_original_error(preview)
            }
        }
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network PocketBase mapping helpers.

    use super::*;
    use rstest::rstest;
    use serde_json::json;

    const URL: &str = "http://pb.test/api/collections/users/records";

    #[rstest]
    #[case("http://pb.test", "api/health", "http://pb.test/api/health")]
    #[case("http://pb.test/", "/api/health", "http://pb.test/api/health")]
    #[case("http://pb.test/base/", "api/health", "http://pb.test/base/api/health")]
    fn endpoints_join_without_double_slashes(
        #[case] base: &str,
        #[case] path: &str,
        #[case] expected: &str,
    ) {
        let base = Url::parse(base).expect("valid base");
        assert_eq!(join_endpoint(&base, path), expected);
    }

    #[test]
    fn error_envelopes_keep_message_and_field_order() {
        let body = json!({
            "status": 400,
            "message": "Failed to create record.",
            "data": {
                "password": { "code": "validation_length_out_of_range", "message": "Too short." },
                "email": { "code": "validation_not_unique", "message": "Value must be unique." }
            }
        });

        let error = map_status_error(URL, StatusCode::BAD_REQUEST, body.to_string().as_bytes());

        assert_eq!(error.status(), 400);
        assert_eq!(error.message(), Some("Failed to create record."));
        let fields: Vec<_> = error.data().keys().cloned().collect();
        assert_eq!(fields, ["password", "email"]);
    }

    #[test]
    fn non_json_error_bodies_are_kept_as_context() {
        let error = map_status_error(URL, StatusCode::BAD_GATEWAY, b"<html> bad   gateway </html>");

        assert_eq!(error.status(), 502);
        assert!(error.message().is_none());
        assert_eq!(error.original_error(), Some("<html> bad gateway </html>"));
    }

    #[rstest]
    #[case(br#"{"code":200,"message":"API is healthy.","data":{}}"#.as_slice(), 200)]
    #[case(b"not json".as_slice(), 0)]
    #[case(b"{}".as_slice(), 0)]
    fn health_bodies_degrade_to_code_zero(#[case] body: &[u8], #[case] expected: u16) {
        assert_eq!(parse_health(StatusCode::OK, body).code, expected);
    }

    #[test]
    fn email_filter_escapes_quotes() {
        assert_eq!(
            email_filter(r#"a"b@example.com"#),
            r#"email="a\"b@example.com""#
        );
    }

    #[test]
    fn create_account_body_requests_visible_email() {
        let account = SignUpCredentials::try_new("User@Example.com", "password123", "password123")
            .expect("valid account");

        let body = serde_json::to_value(CreateAccountDto::from(&account)).expect("serialises");

        assert_eq!(
            body,
            json!({
                "email": "user@example.com",
                "password": "password123",
                "passwordConfirm": "password123",
                "emailVisibility": true
            })
        );
    }
}
