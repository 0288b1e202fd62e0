//! Authentication Flow
//!
//! Login and registration against the journal backend. These are the only
//! unauthenticated REST calls and the only writers of the session store.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::gateway::RequestGateway;
use crate::session::{Session, UserProfile};

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
    first_name: &'a str,
    last_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: String,
    user: UserProfile,
}

/// Client for the auth endpoints.
#[derive(Clone)]
pub struct AuthClient {
    gateway: RequestGateway,
}

impl AuthClient {
    /// Create an auth client over the request gateway.
    #[must_use]
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    /// Log in and install the returned session.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when the request fails; bad credentials
    /// surface as [`ApiError::Http`] with the backend's message.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        let response: AuthResponse = self
            .gateway
            .post_public("/api/auth/login", &LoginRequest { email, password })
            .await?;
        Ok(self.install(response))
    }

    /// Register a new account and install the returned session.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when the request fails.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<UserProfile, ApiError> {
        let response: AuthResponse = self
            .gateway
            .post_public(
                "/api/auth/register",
                &RegisterRequest {
                    email,
                    password,
                    first_name,
                    last_name,
                },
            )
            .await?;
        Ok(self.install(response))
    }

    /// Log out. Purely local: the bearer token is stateless on the server
    /// side, so clearing the session is the whole operation.
    pub fn logout(&self) {
        self.gateway.session().clear();
    }

    /// Fetch the authenticated user's profile and sync the cached copy.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when the request fails.
    pub async fn profile(&self) -> Result<UserProfile, ApiError> {
        let user: UserProfile = self.gateway.get("/api/auth/me").await?;
        self.sync_user(user.clone());
        Ok(user)
    }

    /// Update the profile's name fields.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when the request fails.
    pub async fn update_profile(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<UserProfile, ApiError> {
        let user: UserProfile = self
            .gateway
            .put(
                "/api/auth/me",
                &serde_json::json!({
                    "first_name": first_name,
                    "last_name": last_name,
                }),
            )
            .await?;
        self.sync_user(user.clone());
        Ok(user)
    }

    /// Upload a new avatar image.
    ///
    /// # Errors
    ///
    /// Returns the gateway error when the request fails.
    pub async fn upload_avatar(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UserProfile, ApiError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("avatar", part);

        let user: UserProfile = self.gateway.post_multipart("/api/auth/avatar", form).await?;
        self.sync_user(user.clone());
        Ok(user)
    }

    fn install(&self, response: AuthResponse) -> UserProfile {
        self.gateway.session().set(Session {
            token: response.access_token,
            user: response.user.clone(),
        });
        response.user
    }

    fn sync_user(&self, user: UserProfile) {
        let session = self.gateway.session();
        if let Some(token) = session.token() {
            session.set(Session { token, user });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_response_decodes() {
        let json = r#"{
            "access_token": "jwt-abc",
            "user": {
                "id": 7,
                "email": "trader@example.com",
                "first_name": "Ava",
                "last_name": "Nguyen",
                "avatar_url": null
            }
        }"#;

        let response: AuthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.access_token, "jwt-abc");
        assert_eq!(response.user.id, 7);
        assert!(response.user.avatar_url.is_none());
    }

    #[test]
    fn login_request_shape() {
        let body = serde_json::to_value(LoginRequest {
            email: "trader@example.com",
            password: "hunter2",
        })
        .unwrap();
        assert_eq!(body["email"], "trader@example.com");
        assert_eq!(body["password"], "hunter2");
    }
}
