//! Tests for sign-up classification and message resolution.

use super::*;
use rstest::{fixture, rstest};
use serde_json::json;

#[fixture]
fn response() -> ClientResponseError {
    ClientResponseError::new("http://127.0.0.1:8090/api/collections/users/records", 400)
}

fn field(name: &str, code: &str, message: &str) -> FieldError {
    FieldError {
        field: name.to_owned(),
        code: code.to_owned(),
        message: message.to_owned(),
    }
}

#[rstest]
fn uniqueness_violation_wins_over_other_fields(response: ClientResponseError) {
    let raw = RawFailure::from(response.with_message("Failed to create record.").with_data(
        json!({
            "password": { "code": "validation_length_out_of_range", "message": "Too short." },
            "email": { "code": NOT_UNIQUE_CODE, "message": "Value must be unique." }
        }),
    ));

    let error = classify_sign_up_error(&raw);

    assert_eq!(
        error,
        AuthError::UserExists {
            message: "Value must be unique.".to_owned()
        }
    );
}

#[rstest]
#[case("The email is already in use.")]
#[case("User EXISTS")]
fn existing_account_wording_maps_to_user_exists(
    response: ClientResponseError,
    #[case] message: &str,
) {
    let raw = RawFailure::from(
        response.with_data(json!({ "email": { "code": "custom", "message": message } })),
    );

    assert_eq!(classify_sign_up_error(&raw).code(), AuthErrorCode::UserExists);
}

#[rstest]
fn field_errors_map_to_validation_failure_in_backend_order(response: ClientResponseError) {
    let raw = RawFailure::from(response.with_data(json!({
        "password": { "code": "validation_length_out_of_range", "message": "Too short." },
        "passwordConfirm": { "code": "validation_values_mismatch", "message": "Values don't match." }
    })));

    let error = classify_sign_up_error(&raw);

    let expected: FieldErrors = [
        field("password", "validation_length_out_of_range", "Too short."),
        field(
            "passwordConfirm",
            "validation_values_mismatch",
            "Values don't match.",
        ),
    ]
    .into_iter()
    .collect();
    assert_eq!(error, AuthError::SignUpValidationFailed(expected));
    assert_eq!(error.message(), "Too short.");
}

#[rstest]
fn validation_failure_prefers_email_message(response: ClientResponseError) {
    let raw = RawFailure::from(response.with_data(json!({
        "name": { "code": "a", "message": "too short" },
        "email": { "code": "validation_is_email", "message": "Must be a valid email address." }
    })));

    let error = classify_sign_up_error(&raw);

    assert_eq!(error.code(), AuthErrorCode::SignUpValidationFailed);
    assert_eq!(error.message(), "Must be a valid email address.");
}

#[rstest]
fn failures_without_fields_are_unknown(response: ClientResponseError) {
    let raw = RawFailure::from(response.with_message("Failed to create record."));

    assert_eq!(
        classify_sign_up_error(&raw),
        AuthError::Unknown {
            message: "Failed to create record.".to_owned()
        }
    );
}

#[rstest]
fn classified_errors_are_not_reclassified() {
    let raw = RawFailure::from(AuthError::PasswordTooShort);
    assert_eq!(classify_sign_up_error(&raw), AuthError::PasswordTooShort);
}

#[rstest]
fn opaque_failures_are_unknown() {
    let raw = RawFailure::Other(Box::new(std::io::Error::other("socket closed")));
    assert_eq!(
        classify_sign_up_error(&raw),
        AuthError::Unknown {
            message: "socket closed".to_owned()
        }
    );
}

#[rstest]
fn extract_prefers_email_field_over_earlier_fields(response: ClientResponseError) {
    let raw = RawFailure::from(response.with_data(json!({
        "name": { "code": "x", "message": "too short" },
        "email": { "code": "y", "message": "taken" }
    })));

    assert_eq!(extract_message(&raw), "taken");
}

#[rstest]
fn extract_prefers_top_level_message(response: ClientResponseError) {
    let raw = RawFailure::from(
        response
            .with_message("Failed to create record.")
            .with_data(json!({ "email": { "code": "y", "message": "taken" } })),
    );

    assert_eq!(extract_message(&raw), "Failed to create record.");
}

#[rstest]
#[case(json!({ "message": "payload message", "name": { "message": "field" } }), "payload message")]
#[case(json!({ "error": "payload error", "name": { "message": "field" } }), "payload error")]
#[case(json!({ "name": { "message": "" }, "age": { "message": "too young" } }), "too young")]
#[case(json!({ "name": "not an object" }), FALLBACK_MESSAGE)]
#[case(json!({}), FALLBACK_MESSAGE)]
fn extract_walks_payload_priority_chain(
    response: ClientResponseError,
    #[case] data: Value,
    #[case] expected: &str,
) {
    let raw = RawFailure::from(response.with_data(data));
    assert_eq!(extract_message(&raw), expected);
}

#[rstest]
#[case(RawFailure::from(AuthError::user_exists()), "Email is already registered")]
#[case(RawFailure::from("plain text"), "plain text")]
#[case(RawFailure::from(""), FALLBACK_MESSAGE)]
#[case(RawFailure::Other(Box::new(std::io::Error::other(""))), FALLBACK_MESSAGE)]
fn extract_handles_non_response_shapes(#[case] raw: RawFailure, #[case] expected: &str) {
    assert_eq!(extract_message(&raw), expected);
}

#[rstest]
#[case(0, SignInFailureKind::BackendUnreachable)]
#[case(400, SignInFailureKind::InvalidCredentials)]
#[case(429, SignInFailureKind::Rejected)]
#[case(503, SignInFailureKind::BackendUnreachable)]
fn sign_in_failures_are_categorised(#[case] status: u16, #[case] expected: SignInFailureKind) {
    let error = ClientResponseError::new("http://pb", status).with_message("Failed to authenticate.");

    match classify_sign_in_error(&error) {
        AuthError::SignInFailed { kind, message } => {
            assert_eq!(kind, expected);
            assert_eq!(message, "Failed to authenticate.");
        }
        other => panic!("expected SignInFailed, got {other:?}"),
    }
}

#[rstest]
fn error_codes_are_stable() {
    let rendered = serde_json::to_value(AuthErrorCode::PasswordsDoNotMatch).expect("serialises");
    assert_eq!(rendered, json!("PASSWORDS_DO_NOT_MATCH"));
    assert_eq!(AuthErrorCode::UserExists.to_string(), "USER_EXISTS");
}
