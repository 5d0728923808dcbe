use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Loyalty program rules. Everything the ledger math depends on lives
/// here so no threshold is hardcoded at a use site.
#[derive(Debug, Clone, Deserialize)]
pub struct LoyaltyConfig {
    /// Minor currency units per point earned (100 = Rp 100 : 1 XP).
    pub conversion_rate: i64,
    pub gold_threshold: i64,
    pub platinum_threshold: i64,
    /// Rolling window a ledger entry stays valid for, in days.
    pub xp_validity_days: i64,
    /// Voucher lifetime from issuance, in days.
    pub voucher_validity_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub loyalty: LoyaltyConfig,
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "gongcha-loyalty".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "gongcha-members".into()),
            ttl_minutes: env_i64("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_i64("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        let loyalty = LoyaltyConfig {
            conversion_rate: env_i64("LOYALTY_CONVERSION_RATE", 100).max(1),
            gold_threshold: env_i64("LOYALTY_GOLD_THRESHOLD", 5_000),
            platinum_threshold: env_i64("LOYALTY_PLATINUM_THRESHOLD", 15_000),
            xp_validity_days: env_i64("LOYALTY_XP_VALIDITY_DAYS", 365),
            voucher_validity_days: env_i64("LOYALTY_VOUCHER_VALIDITY_DAYS", 30),
        };
        Ok(Self {
            database_url,
            jwt,
            loyalty,
        })
    }
}
