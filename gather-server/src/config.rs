pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 3;
pub const MAX_BIO_LENGTH: usize = 500;
pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_POST_LENGTH: usize = 5000;
pub const MAX_COMMENT_LENGTH: usize = 1000;
pub const MAX_MESSAGE_LENGTH: usize = 2000;

pub fn token_expiration_hours() -> i64 {
    std::env::var("GATHER_TOKEN_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(24)
}

pub fn code_ttl_secs() -> u64 {
    std::env::var("GATHER_CODE_TTL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(600)
}

pub fn db_path(port: u16) -> String {
    std::env::var("GATHER_DB_PATH").unwrap_or_else(|_| String::from("gather") + &port.to_string())
}
