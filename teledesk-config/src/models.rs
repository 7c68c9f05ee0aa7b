/// Resolved application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Base URL of the backing record store.
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Page size for user listing fetches.
    pub page_size: usize,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                base_url: "http://localhost:3001".to_string(),
            },
            store: StoreConfig { page_size: 10 },
            http: HttpConfig { timeout_secs: 30 },
        }
    }
}
