use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    models::{Identity, Role},
    resolver::RoleResolver,
};

/// Claims
///
/// Payload of the identity token issued by the external auth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the provider's stable user id, also the profile key.
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: usize,
    pub iat: usize,
}

/// AccessContext
///
/// The identity (if any) behind a request and the role it resolved to. This is
/// what every route decision is made against.
#[derive(Debug, Clone)]
pub struct AccessContext {
    pub identity: Option<Identity>,
    pub role: Role,
}

impl AccessContext {
    pub fn public() -> Self {
        Self {
            identity: None,
            role: Role::Public,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some() && self.role.is_authenticated()
    }
}

/// AccessContext Extractor Implementation
///
/// Never rejects. An absent, malformed or expired token, or a role lookup that
/// fails, all produce the public context, so rendering is never blocked by the
/// identity source or the profile store.
///
/// The resolved context is cached in the request extensions, so the navigation
/// guard and the handler behind it share a single resolution.
impl<S> FromRequestParts<S> for AccessContext
where
    S: Send + Sync,
    RoleResolver: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 1. Cached Context
        if let Some(cached) = parts.extensions.get::<AccessContext>() {
            return Ok(cached.clone());
        }

        // 2. Identity Source
        let config = AppConfig::from_ref(state);
        let context = match identity_from_parts(parts, &config) {
            // 3. Role Resolution
            // Only a verified token may create a profile; bypass ids are looked up.
            Some((identity, source)) => {
                let resolver = RoleResolver::from_ref(state);
                let role = match source {
                    IdentitySource::BearerToken => resolver.resolve_role(&identity).await,
                    IdentitySource::LocalBypass => resolver.lookup_role(&identity).await,
                };
                AccessContext {
                    identity: Some(identity),
                    role,
                }
            }
            None => AccessContext::public(),
        };

        // 4. Request-Scoped Cache
        parts.extensions.insert(context.clone());
        Ok(context)
    }
}

/// AuthUser
///
/// A signed-in caller of a JSON API endpoint. Unlike page navigation, API calls
/// are answered with `401 Unauthorized` when the caller is public.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub identity: Identity,
    pub role: Role,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RoleResolver: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let context = match AccessContext::from_request_parts(parts, state).await {
            Ok(context) => context,
            Err(never) => match never {},
        };

        match context {
            AccessContext {
                identity: Some(identity),
                role,
            } if role.is_authenticated() => Ok(AuthUser { identity, role }),
            _ => Err(StatusCode::UNAUTHORIZED),
        }
    }
}

/// Where a request's identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    /// The `x-user-id` header, honoured only in `Env::Local`.
    LocalBypass,
    /// A signed, unexpired `Bearer` token.
    BearerToken,
}

/// identity_from_parts
///
/// The identity source for HTTP requests.
///
/// 1. Local bypass: in `Env::Local`, an `x-user-id` header (with optional
///    `x-user-email`) is taken as the signed-in identity. Bypass identities are
///    only looked up: an id with no stored profile stays public and no profile
///    is created for it, so arbitrary header values never reach the store as
///    writes.
/// 2. Otherwise a `Bearer` token is decoded and validated (signature and expiry).
///
/// Returns `None` when no usable identity is present.
pub fn identity_from_parts(
    parts: &Parts,
    config: &AppConfig,
) -> Option<(Identity, IdentitySource)> {
    if config.env == Env::Local {
        if let Some(id) = header_str(parts, "x-user-id").filter(|id| !id.trim().is_empty()) {
            let email = header_str(parts, "x-user-email").map(str::to_string);
            return Some((Identity::new(id.trim(), email), IdentitySource::LocalBypass));
        }
    }

    let token = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?
        .strip_prefix("Bearer ")?;

    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Some((
            Identity::new(data.claims.sub, data.claims.email),
            IdentitySource::BearerToken,
        )),
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("identity token expired"),
                _ => tracing::warn!(error = %e, "rejected identity token"),
            }
            None
        }
    }
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|value| value.to_str().ok())
}
