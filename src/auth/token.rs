use rand::{rngs::OsRng, RngCore};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo::User;

/// Generate a fresh opaque token: 40 hex chars from 20 random bytes.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 20];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Return the user's token, creating one on first login.
///
/// The table holds at most one token per user; a concurrent login keeps
/// whichever row landed first.
pub async fn get_or_create(db: &PgPool, user_id: Uuid) -> anyhow::Result<String> {
    let token = sqlx::query_scalar::<_, String>(
        r#"
        INSERT INTO auth_tokens (token, user_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET token = auth_tokens.token
        RETURNING token
        "#,
    )
    .bind(generate_token())
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(token)
}

/// Resolve a bearer token to its active owner.
pub async fn find_user(db: &PgPool, token: &str) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.email, u.password_hash, u.name,
               u.is_active, u.is_staff, u.is_superuser, u.created_at
        FROM users u
        JOIN auth_tokens t ON t.user_id = u.id
        WHERE t.token = $1 AND u.is_active
        "#,
    )
    .bind(token)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_40_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 40);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(generate_token(), generate_token());
    }
}
