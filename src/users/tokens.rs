use rand::{distributions::Alphanumeric, Rng};
use time::{Duration, OffsetDateTime};

pub const VERIFY_TOKEN_LEN: usize = 64;
pub const VERIFY_TOKEN_TTL: Duration = Duration::hours(1);

/// Random single-use token stored against a user until consumed or expired.
pub fn generate_verify_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(VERIFY_TOKEN_LEN)
        .map(char::from)
        .collect()
}

pub fn verify_token_expiry() -> OffsetDateTime {
    OffsetDateTime::now_utc() + VERIFY_TOKEN_TTL
}
