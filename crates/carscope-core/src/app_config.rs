#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub gemini_timeout_secs: u64,
    pub env: Environment,
    pub log_level: String,
    pub batch_size: i64,
    pub chunk_size: usize,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub chunk_pause_ms: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[redacted]")
            .field("gemini_api_key", &"[redacted]")
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("gemini_timeout_secs", &self.gemini_timeout_secs)
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("batch_size", &self.batch_size)
            .field("chunk_size", &self.chunk_size)
            .field("max_retries", &self.max_retries)
            .field("retry_delay_secs", &self.retry_delay_secs)
            .field("chunk_pause_ms", &self.chunk_pause_ms)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
