use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetsConfig {
    /// OAuth access token for the Sheets API; obtaining it is outside this
    /// service (service-account flow, gcloud, etc.).
    pub api_token: String,
    pub sheet_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub remember_ttl_days: i64,
    pub default_ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub gemini: GeminiConfig,
    pub sheets: SheetsConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let gemini = GeminiConfig {
            api_key: std::env::var("GEMINI_API_KEY")?,
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".into()),
            timeout_secs: std::env::var("GEMINI_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        };
        let sheets = SheetsConfig {
            api_token: std::env::var("SHEETS_API_TOKEN")?,
            sheet_name: std::env::var("SHEET_NAME").unwrap_or_else(|_| "transactions".into()),
        };
        let session = SessionConfig {
            remember_ttl_days: std::env::var("SESSION_REMEMBER_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
            default_ttl_hours: std::env::var("SESSION_DEFAULT_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(2),
        };
        Ok(Self {
            database_url,
            gemini,
            sheets,
            session,
        })
    }
}
