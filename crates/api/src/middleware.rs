use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use rentloop_auth::{JwtClaims, Role, validate_claims};
use rentloop_core::UserId;

use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    decoding_key: Arc<DecodingKey>,
    validation: Validation,
}

impl AuthState {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Claim-window checks run through validate_claims with one `now`,
        // not the library's wall clock.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            decoding_key: Arc::new(DecodingKey::from_secret(secret)),
            validation,
        }
    }
}

/// Raw claim layout on the wire.
#[derive(Debug, Deserialize)]
struct WireClaims {
    sub: String,
    role: String,
    iat: i64,
    exp: i64,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_bearer(req.headers())?;
    let claims = decode_claims(&state, token, Utc::now())?;

    req.extensions_mut()
        .insert(PrincipalContext::new(claims.sub, claims.role));

    Ok(next.run(req).await)
}

fn decode_claims(state: &AuthState, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, StatusCode> {
    let data = jsonwebtoken::decode::<WireClaims>(token, &state.decoding_key, &state.validation)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let sub: UserId = data.claims.sub.parse().map_err(|_| StatusCode::UNAUTHORIZED)?;
    let role: Role = data.claims.role.parse().map_err(|_| StatusCode::UNAUTHORIZED)?;
    let issued_at =
        DateTime::<Utc>::from_timestamp(data.claims.iat, 0).ok_or(StatusCode::UNAUTHORIZED)?;
    let expires_at =
        DateTime::<Utc>::from_timestamp(data.claims.exp, 0).ok_or(StatusCode::UNAUTHORIZED)?;

    let claims = JwtClaims {
        sub,
        role,
        issued_at,
        expires_at,
    };
    validate_claims(&claims, now).map_err(|_| StatusCode::UNAUTHORIZED)?;

    Ok(claims)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    const SECRET: &[u8] = b"test-secret";

    fn token(sub: &str, role: &str, iat: i64, exp: i64) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &json!({"sub": sub, "role": role, "iat": iat, "exp": exp}),
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_claims() {
        let state = AuthState::new(SECRET);
        let user = UserId::new();
        let now = Utc::now();
        let t = token(
            &user.to_string(),
            "customer",
            (now - Duration::minutes(1)).timestamp(),
            (now + Duration::hours(1)).timestamp(),
        );

        let claims = decode_claims(&state, &t, now).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.role, Role::Customer);
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let state = AuthState::new(b"other-secret");
        let now = Utc::now();
        let t = token(
            &UserId::new().to_string(),
            "store",
            (now - Duration::minutes(1)).timestamp(),
            (now + Duration::hours(1)).timestamp(),
        );

        assert_eq!(decode_claims(&state, &t, now), Err(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let state = AuthState::new(SECRET);
        let now = Utc::now();
        let t = token(
            &UserId::new().to_string(),
            "customer",
            (now - Duration::hours(2)).timestamp(),
            (now - Duration::hours(1)).timestamp(),
        );

        assert_eq!(decode_claims(&state, &t, now), Err(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn unknown_role_is_unauthorized() {
        let state = AuthState::new(SECRET);
        let now = Utc::now();
        let t = token(
            &UserId::new().to_string(),
            "admin",
            (now - Duration::minutes(1)).timestamp(),
            (now + Duration::hours(1)).timestamp(),
        );

        assert_eq!(decode_claims(&state, &t, now), Err(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), Err(StatusCode::UNAUTHORIZED));

        headers.insert(axum::http::header::AUTHORIZATION, "Bearer  abc ".parse().unwrap());
        assert_eq!(extract_bearer(&headers).unwrap(), "abc");

        headers.insert(axum::http::header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(extract_bearer(&headers), Err(StatusCode::UNAUTHORIZED));
    }
}
