//! Unit tests for OAuth credential loading.
//!
//! Covers the authorized-user file path, env-var fallback when the
//! keychain has no entries, and error quality for missing values.
//!
//! Env-var tests mutate process-global state and run serially.

use std::io::Write;

use vacation_responder::config::GlobalConfig;
use vacation_responder::AppError;

const ENV_KEYS: [&str; 3] = [
    "GMAIL_CLIENT_ID",
    "GMAIL_CLIENT_SECRET",
    "GMAIL_REFRESH_TOKEN",
];

fn base_config(auth_section: &str) -> GlobalConfig {
    let toml = format!(
        r#"
[label]
name = "Vacation"

[reply]
body = "Away."

{auth_section}
"#
    );
    GlobalConfig::from_toml_str(&toml).expect("config parses")
}

fn write_credentials(json: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(json.as_bytes()).expect("write credentials");
    file
}

fn config_with_file(file: &tempfile::NamedTempFile) -> GlobalConfig {
    let path = file.path().to_str().expect("utf8 path").replace('\\', "/");
    base_config(&format!("[auth]\ncredentials_file = '{path}'"))
}

fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

#[tokio::test]
async fn credentials_file_populates_auth() {
    let file = write_credentials(
        r#"{
            "type": "authorized_user",
            "client_id": "id.apps.googleusercontent.com",
            "client_secret": "secret",
            "refresh_token": "1//refresh"
        }"#,
    );
    let mut config = config_with_file(&file);

    config.load_credentials().await.expect("credentials load");

    assert_eq!(config.auth.client_id, "id.apps.googleusercontent.com");
    assert_eq!(config.auth.client_secret, "secret");
    assert_eq!(config.auth.refresh_token, "1//refresh");
    assert_eq!(config.auth.token_uri, "https://oauth2.googleapis.com/token");
}

#[tokio::test]
async fn credentials_file_token_uri_is_honoured() {
    let file = write_credentials(
        r#"{
            "client_id": "id",
            "client_secret": "secret",
            "refresh_token": "1//refresh",
            "token_uri": "http://127.0.0.1:9999/token"
        }"#,
    );
    let mut config = config_with_file(&file);

    config.load_credentials().await.expect("credentials load");

    assert_eq!(config.auth.token_uri, "http://127.0.0.1:9999/token");
}

#[tokio::test]
async fn credentials_file_without_refresh_token_is_auth_error() {
    let file = write_credentials(r#"{"client_id":"id","client_secret":"s","refresh_token":""}"#);
    let mut config = config_with_file(&file);

    let err = config.load_credentials().await.expect_err("empty token");

    assert!(matches!(err, AppError::Auth(_)), "got {err:?}");
}

#[tokio::test]
async fn malformed_credentials_file_is_auth_error() {
    let file = write_credentials("not json");
    let mut config = config_with_file(&file);

    let err = config.load_credentials().await.expect_err("bad json");

    assert!(err.to_string().starts_with("auth:"));
}

#[tokio::test]
async fn missing_credentials_file_is_auth_error() {
    let mut config = base_config("[auth]\ncredentials_file = '/nonexistent/vacation/creds.json'");

    let err = config.load_credentials().await.expect_err("missing file");

    assert!(err.to_string().contains("credentials file"), "got {err}");
}

/// Env vars are used when the keychain service has no entries, as in CI.
#[tokio::test]
#[serial_test::serial]
async fn env_var_only_credential_loading() {
    let mut config = base_config("");
    std::env::set_var("GMAIL_CLIENT_ID", "env-client");
    std::env::set_var("GMAIL_CLIENT_SECRET", "env-secret");
    std::env::set_var("GMAIL_REFRESH_TOKEN", "env-refresh");

    let result = config.load_credentials().await;
    clear_env();

    assert!(result.is_ok(), "load_credentials should succeed with env vars");
    assert_eq!(config.auth.client_id, "env-client");
    assert_eq!(config.auth.client_secret, "env-secret");
    assert_eq!(config.auth.refresh_token, "env-refresh");
}

#[tokio::test]
#[serial_test::serial]
async fn missing_refresh_token_names_env_var() {
    let mut config = base_config("");
    clear_env();
    std::env::set_var("GMAIL_CLIENT_ID", "env-client");
    std::env::set_var("GMAIL_CLIENT_SECRET", "env-secret");

    let result = config.load_credentials().await;
    clear_env();

    let err = result.expect_err("refresh token missing");
    let msg = err.to_string();
    assert!(msg.contains("GMAIL_REFRESH_TOKEN"), "got {msg}");
    assert!(msg.contains("refresh_token"), "got {msg}");
}

#[tokio::test]
#[serial_test::serial]
async fn empty_env_var_counts_as_missing() {
    let mut config = base_config("");
    clear_env();
    std::env::set_var("GMAIL_CLIENT_ID", "");

    let result = config.load_credentials().await;
    clear_env();

    let err = result.expect_err("empty client id");
    assert!(err.to_string().contains("GMAIL_CLIENT_ID"));
}
