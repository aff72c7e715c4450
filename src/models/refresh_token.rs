use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// A refresh token row. Only the SHA-256 hash of the opaque token is stored.
/// The session id is minted at login and carried through rotations, so all
/// audit events of one login session correlate.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub token_hash: String,
    pub used: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
