//! Authentication decorator.
//!
//! Guards protected routes: without a verifiable token, the request is
//! answered with a generic 401 that does not reveal whether the resource
//! exists. Token verification itself is a collaborator behind
//! [`TokenVerifier`]; the pipeline only cares that it yields a user or
//! nothing.

use std::sync::Arc;

use http::header::AUTHORIZATION;
use http::StatusCode;
use serde::Serialize;

use tally_core::{ArgKey, Reply};
use tally_pipeline::{Decorator, Dispatch};

/// Bag key under which the authenticated user is stored.
pub static AUTHENTICATED_USER: ArgKey<AuthenticatedUser> = ArgKey::new("authenticated-user");

/// The identity a verified token resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    /// Account ID of the user.
    pub id: u64,
    /// The user's email address.
    pub email: String,
}

/// Verifies bearer tokens. Implemented by the identity collaborator;
/// stood in by [`StaticTokenVerifier`] outside production.
pub trait TokenVerifier: Send + Sync {
    /// Resolves a token to a user, or `None` if it does not verify.
    fn verify(&self, token: &str) -> Option<AuthenticatedUser>;
}

/// A verifier accepting exactly one configured token.
pub struct StaticTokenVerifier {
    token: String,
    user: AuthenticatedUser,
}

impl StaticTokenVerifier {
    /// Creates a verifier mapping `token` to `user`.
    #[must_use]
    pub fn new(token: impl Into<String>, user: AuthenticatedUser) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }
}

impl TokenVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> Option<AuthenticatedUser> {
        (token == self.token).then(|| self.user.clone())
    }
}

/// Decorator requiring a verified user before the handler runs.
///
/// On success the user lands in the bag under [`AUTHENTICATED_USER`]; on
/// any failure (absent header, malformed header, unverifiable token) the
/// reply is the same generic 401.
pub struct RequireAuthenticatedUser {
    verifier: Arc<dyn TokenVerifier>,
}

impl RequireAuthenticatedUser {
    /// Creates the decorator over a verifier.
    #[must_use]
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }
}

impl Decorator for RequireAuthenticatedUser {
    fn name(&self) -> &'static str {
        "require-authenticated-user"
    }

    fn wrap(&self, next: Dispatch) -> Dispatch {
        let verifier = Arc::clone(&self.verifier);
        Arc::new(move |request, mut arguments| {
            let next = Arc::clone(&next);
            let verifier = Arc::clone(&verifier);
            Box::pin(async move {
                let user = request
                    .headers()
                    .get(AUTHORIZATION)
                    .and_then(|value| value.to_str().ok())
                    .map(|raw| raw.strip_prefix("Bearer ").unwrap_or(raw))
                    .and_then(|token| verifier.verify(token));

                match user {
                    Some(user) => {
                        tracing::debug!(user_id = user.id, "request authenticated");
                        arguments.set(&AUTHENTICATED_USER, user);
                        next(request, arguments).await
                    }
                    None => Reply::error(
                        StatusCode::UNAUTHORIZED,
                        "invalid or missing authentication",
                    ),
                }
            })
        })
    }
}
