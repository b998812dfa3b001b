pub struct Env {
    pub jwt_secret: String,
    pub access_token_expiration: u64,
    pub refresh_token_expiration: u64,
    pub database_url: String,
    pub redis_url: String,
    pub frontend_url: String,
    pub ip: String,
    pub port: u16,
}

fn required(key: &str) -> String {
    std::env::var(key)
        .unwrap_or_else(|_| panic!("{key} must be set in .env file or environment variable"))
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: &str) -> T {
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .unwrap_or_else(|_| panic!("{key} must be a valid value"))
}

impl Env {
    fn new() -> Self {
        Env {
            jwt_secret: required("SECRET_KEY"),
            access_token_expiration: parsed_or("ACCESS_TOKEN_EXPIRATION", "900"),
            refresh_token_expiration: parsed_or("REFRESH_TOKEN_EXPIRATION", "604800"),
            database_url: required("DATABASE_URL"),
            redis_url: required("REDIS_URL"),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            ip: std::env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parsed_or("PORT", "8080"),
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
