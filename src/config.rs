use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Telegram bot token for outcome notifications. Unset means the
    /// notifier degrades to a logged no-op (useful in development).
    pub bot_token: Option<String>,
    pub yookassa_shop_id: String,
    pub yookassa_secret_key: String,
    /// Gateway API root. Overridable for tests against a mock server.
    /// Set via YOOKASSA_BASE_URL. Default: https://api.yookassa.ru/v3.
    pub yookassa_base_url: String,
    /// How long a reservation holds a key, in minutes. Default: 5.
    pub hold_minutes: i64,
    /// Pending charges older than this are swept, in minutes. Default: 3.
    pub stale_after_minutes: i64,
    /// Sweep period in seconds. Default: 120.
    pub sweep_interval_secs: u64,
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let yookassa_shop_id = std::env::var("YOOKASSA_SHOP_ID").unwrap_or_default();
    let yookassa_secret_key = std::env::var("YOOKASSA_SECRET_KEY").unwrap_or_default();

    if yookassa_shop_id.is_empty() || yookassa_secret_key.is_empty() {
        eprintln!(
            "⚠️  YOOKASSA_SHOP_ID / YOOKASSA_SECRET_KEY are not set — charge creation will fail."
        );
    }

    Ok(Config {
        port: std::env::var("KEYVEND_PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .unwrap_or(8080),
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/keyvend".into()),
        bot_token: std::env::var("TELEGRAM_BOT_TOKEN").ok(),
        yookassa_shop_id,
        yookassa_secret_key,
        yookassa_base_url: std::env::var("YOOKASSA_BASE_URL")
            .unwrap_or_else(|_| "https://api.yookassa.ru/v3".into()),
        hold_minutes: std::env::var("KEYVEND_HOLD_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5),
        stale_after_minutes: std::env::var("KEYVEND_STALE_AFTER_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3),
        sweep_interval_secs: std::env::var("KEYVEND_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(120),
    })
}
