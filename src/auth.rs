//! Session management against the backend's auth endpoints.
//!
//! The cache core treats authentication as an opaque collaborator: it only
//! reacts to the unauthenticated signal (any 401 halts further fetches).
//! This service owns the other direction: establishing a session, resuming
//! the store, and tearing everything down on logout.

use std::sync::{Arc, RwLock};
use tracing::info;

use crate::api::client::paths;
use crate::api::types::{LoginRequest, LoginResponse, User};
use crate::api::{ApiClient, ApiError};
use crate::store::{CacheStore, ResourceKey};

#[derive(Clone)]
pub struct AuthService {
  api: ApiClient,
  store: CacheStore,
  user: Arc<RwLock<Option<User>>>,
}

impl AuthService {
  pub fn new(api: ApiClient, store: CacheStore) -> Self {
    Self {
      api,
      store,
      user: Arc::new(RwLock::new(None)),
    }
  }

  /// Whether a session token is present. Says nothing about its validity;
  /// the first 401 will halt fetches and push the user back to login.
  pub fn has_session(&self) -> bool {
    self.api.has_token()
  }

  /// The user from the last successful login or `current_user` call.
  pub fn user(&self) -> Option<User> {
    self.user.read().expect("auth lock poisoned").clone()
  }

  /// Exchange credentials for a session. On success the token is installed,
  /// halted fetches resume, and the `/api/users/me` cache is seeded so the
  /// header renders without another round-trip.
  pub async fn login(&self, username: String, password: String) -> Result<User, ApiError> {
    let request = LoginRequest { username, password };
    let LoginResponse { token, user } = self.api.login(&request).await?;

    self.api.set_token(Some(token));
    self.store.resume();
    if let Ok(value) = serde_json::to_value(&user) {
      self.store.set(&ResourceKey::get(paths::ME), value);
    }
    *self.user.write().expect("auth lock poisoned") = Some(user.clone());
    info!(username = %user.username, role = ?user.role, "logged in");

    Ok(user)
  }

  /// Drop the session. The backend call is best-effort: even if it fails,
  /// the local token is gone and fetches are halted.
  pub async fn logout(&self) {
    let _ = self.api.logout().await;
    self.api.set_token(None);
    *self.user.write().expect("auth lock poisoned") = None;
    self.store.halt();
    info!("logged out");
  }

  /// Fetch the authenticated user from the backend.
  pub async fn current_user(&self) -> Result<User, ApiError> {
    let user = self.api.current_user().await?;
    *self.user.write().expect("auth lock poisoned") = Some(user.clone());
    Ok(user)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{Config, ServerConfig};

  fn unreachable_service() -> AuthService {
    let config = Config {
      server: ServerConfig {
        // Nothing listens here; requests fail fast with a transport error.
        url: "http://127.0.0.1:1".into(),
      },
      ..Default::default()
    };
    let api = ApiClient::new(&config).unwrap();
    api.set_token(Some("stale-token".into()));
    AuthService::new(api, CacheStore::default())
  }

  #[tokio::test]
  async fn test_logout_halts_fetches_even_when_backend_unreachable() {
    let auth = unreachable_service();
    let store = auth.store.clone();
    assert!(!store.is_halted());

    auth.logout().await;

    assert!(store.is_halted());
    assert!(!auth.has_session());
    assert!(auth.user().is_none());
  }

  #[tokio::test]
  async fn test_failed_login_leaves_no_session() {
    let auth = unreachable_service();
    auth.api.set_token(None);

    let result = auth.login("admin".into(), "secret".into()).await;
    assert!(matches!(result, Err(ApiError::Transport(_))));
    assert!(!auth.has_session());
  }
}
