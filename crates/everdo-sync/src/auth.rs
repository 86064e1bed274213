use async_trait::async_trait;
use everdo_core::auth::{
    validate_email, validate_password, AuthError, AuthProvider, AuthSession,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Authentication endpoint settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthConfig {
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Email/password auth over the provider's REST surface. The form-level
/// checks run here too, so a bad address never leaves the device.
pub struct RestAuthProvider {
    cfg: AuthConfig,
    client: reqwest::Client,
}

impl RestAuthProvider {
    pub fn new(cfg: AuthConfig) -> Self {
        Self {
            cfg,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        let base = self
            .cfg
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        format!("{base}/accounts:{action}")
    }

    async fn credential_request(
        &self,
        action: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        validate_email(email)?;
        validate_password(password)?;

        let resp = self
            .client
            .post(self.endpoint(action))
            .query(&[("key", self.cfg.api_key.as_str())])
            .json(&CredentialRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(provider_err)?;

        if resp.status().is_success() {
            let body: CredentialResponse = resp.json().await.map_err(provider_err)?;
            Ok(AuthSession {
                uid: body.local_id,
                email: body.email.unwrap_or_else(|| email.to_string()),
                id_token: body.id_token,
                refresh_token: body.refresh_token,
            })
        } else {
            let body: ErrorResponse = resp.json().await.map_err(provider_err)?;
            Err(map_error_code(&body.error.message))
        }
    }
}

#[async_trait]
impl AuthProvider for RestAuthProvider {
    #[instrument(skip_all)]
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        self.credential_request("signUp", email, password).await
    }

    #[instrument(skip_all)]
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        self.credential_request("signInWithPassword", email, password)
            .await
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, _session: &AuthSession) -> Result<(), AuthError> {
        // Tokens are bearer-only; signing out is discarding the cached
        // session on the caller's side.
        Ok(())
    }

    #[instrument(skip_all)]
    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        validate_email(email)?;
        let resp = self
            .client
            .post(self.endpoint("sendOobCode"))
            .query(&[("key", self.cfg.api_key.as_str())])
            .json(&ResetRequest {
                request_type: "PASSWORD_RESET",
                email,
            })
            .send()
            .await
            .map_err(provider_err)?;
        if resp.status().is_success() {
            Ok(())
        } else {
            let body: ErrorResponse = resp.json().await.map_err(provider_err)?;
            Err(map_error_code(&body.error.message))
        }
    }
}

/// Collapses the provider's error codes into the fixed set of user-facing
/// messages; everything unrecognized stays generic.
pub fn map_error_code(code: &str) -> AuthError {
    match code {
        "EMAIL_EXISTS" => AuthError::EmailInUse,
        "INVALID_EMAIL" => AuthError::InvalidEmail,
        code if code.starts_with("WEAK_PASSWORD") => AuthError::WeakPassword,
        other => AuthError::Provider {
            reason: other.to_string(),
        },
    }
}

fn provider_err(err: reqwest::Error) -> AuthError {
    AuthError::Provider {
        reason: err.to_string(),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
    refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetRequest<'a> {
    request_type: &'static str,
    email: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> RestAuthProvider {
        RestAuthProvider::new(AuthConfig {
            api_key: "k".into(),
            base_url: None,
        })
    }

    #[test]
    fn endpoints_are_keyed_by_action() {
        assert_eq!(
            provider().endpoint("signUp"),
            "https://identitytoolkit.googleapis.com/v1/accounts:signUp"
        );

        let custom = RestAuthProvider::new(AuthConfig {
            api_key: "k".into(),
            base_url: Some("http://localhost:9099/identitytoolkit.googleapis.com/v1/".into()),
        });
        assert_eq!(
            custom.endpoint("sendOobCode"),
            "http://localhost:9099/identitytoolkit.googleapis.com/v1/accounts:sendOobCode"
        );
    }

    #[test]
    fn provider_codes_map_to_the_fixed_message_set() {
        assert_eq!(map_error_code("EMAIL_EXISTS"), AuthError::EmailInUse);
        assert_eq!(map_error_code("INVALID_EMAIL"), AuthError::InvalidEmail);
        assert_eq!(
            map_error_code("WEAK_PASSWORD : Password should be at least 6 characters"),
            AuthError::WeakPassword
        );
        assert_eq!(
            map_error_code("TOO_MANY_ATTEMPTS_TRY_LATER"),
            AuthError::Provider {
                reason: "TOO_MANY_ATTEMPTS_TRY_LATER".to_string()
            }
        );
    }

    #[tokio::test]
    async fn local_validation_short_circuits_before_any_request() {
        // No server is running; a network attempt would surface as a
        // Provider error, not a validation one.
        let err = provider()
            .sign_in("not-an-email", "123456")
            .await
            .expect_err("should fail");
        assert_eq!(err, AuthError::InvalidEmail);

        let err = provider()
            .sign_up("user@example.com", "123")
            .await
            .expect_err("should fail");
        assert_eq!(err, AuthError::WeakPassword);
    }

    #[test]
    fn error_bodies_deserialize() {
        let body: ErrorResponse = serde_json::from_str(
            r#"{ "error": { "code": 400, "message": "EMAIL_EXISTS" } }"#,
        )
        .expect("parse");
        assert_eq!(map_error_code(&body.error.message), AuthError::EmailInUse);
    }
}
