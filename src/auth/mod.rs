//! Static API-key authentication.
//!
//! Callers present `X-API-Key`; the key resolves to an account id through
//! the directory seeded from config. The resolved id rides in request
//! extensions so handlers never see the credential itself. Keys are
//! hardcoded simulation credentials, not a production scheme.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;

/// Account id resolved by the auth middleware.
#[derive(Debug, Clone)]
pub struct CallerAccount(pub String);

/// Key to account-id directory.
#[derive(Debug, Default)]
pub struct ApiKeyDirectory {
    keys: HashMap<String, String>,
}

impl ApiKeyDirectory {
    pub fn new<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            keys: pairs
                .into_iter()
                .map(|(key, account)| (key.into(), account.into()))
                .collect(),
        }
    }

    pub fn resolve(&self, key: &str) -> Option<&str> {
        self.keys.get(key).map(String::as_str)
    }
}

/// Middleware that resolves `X-API-Key` to an account id.
pub async fn api_key_auth(
    State(directory): State<Arc<ApiKeyDirectory>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let key = req
        .headers()
        .get("x-api-key")
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingKey)?;

    let account_id = directory.resolve(key).ok_or(AuthError::UnknownKey)?;
    req.extensions_mut()
        .insert(CallerAccount(account_id.to_string()));

    Ok(next.run(req).await)
}

#[derive(Debug)]
pub enum AuthError {
    MissingKey,
    UnknownKey,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingKey => "Missing X-API-Key header",
            AuthError::UnknownKey => "Invalid API key",
        };
        (StatusCode::UNAUTHORIZED, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_keys_resolve_to_their_accounts() {
        let directory = ApiKeyDirectory::new(crate::config::default_api_keys());
        assert_eq!(directory.resolve("demo-key-123"), Some("demo_user"));
        assert_eq!(directory.resolve("admin-key-456"), Some("admin_user"));
        assert_eq!(directory.resolve("trader-key-789"), Some("trader_user"));
    }

    #[test]
    fn unknown_keys_do_not_resolve() {
        let directory = ApiKeyDirectory::new(crate::config::default_api_keys());
        assert_eq!(directory.resolve("stolen-key"), None);
        assert_eq!(directory.resolve(""), None);
    }
}
