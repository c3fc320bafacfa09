use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

use recall_backend::auth::Claims;

/// Mints a token the way the account service does.
pub fn token_for(user_id: &str, secret: &str) -> String {
    token_with_type(user_id, secret, "user")
}

pub fn token_with_type(user_id: &str, secret: &str, token_type: &str) -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        token_type: token_type.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(1)).timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("sign test token")
}

pub fn auth_header(token: &str) -> String {
    format!("Bearer {token}")
}
