use std::time::Duration;

const URL_SCHEME: &str = "sqlite://";
const MEMORY_URL: &str = "sqlite::memory:";
const MEMORY_PATH: &str = ":memory:";

/// Connection configuration for [`SqliteConnection`](super::SqliteConnection)
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Database file path, or `:memory:`
    pub path: String,

    /// Open the database read-only
    pub read_only: bool,

    /// How long a statement waits on a locked database before failing
    pub busy_timeout: Duration,

    /// Enforce foreign key constraints
    pub foreign_keys: bool,
}

impl ConnectionConfig {
    /// Configuration for a database file
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            read_only: false,
            busy_timeout: Duration::from_secs(5),
            foreign_keys: true,
        }
    }

    /// Configuration for a private in-memory database
    pub fn in_memory() -> Self {
        Self::new(MEMORY_PATH)
    }

    pub fn is_in_memory(&self) -> bool {
        self.path == MEMORY_PATH
    }

    /// Open the database read-only
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Set the busy timeout
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Parse from connection string
    ///
    /// Format: `sqlite://path/to/file.db` or `sqlite::memory:`. A bare path
    /// is accepted as a file path.
    ///
    /// # Examples
    ///
    /// ```
    /// use tablestore::ConnectionConfig;
    ///
    /// let config = ConnectionConfig::from_url("sqlite:///var/lib/app/docs.db").unwrap();
    /// assert_eq!(config.path, "/var/lib/app/docs.db");
    /// ```
    pub fn from_url(url: &str) -> Result<Self, String> {
        if url == MEMORY_URL || url == MEMORY_PATH {
            return Ok(Self::in_memory());
        }

        let path = match url.strip_prefix(URL_SCHEME) {
            Some(path) => path,
            None if url.contains("://") => {
                return Err(format!("URL must start with '{}'", URL_SCHEME));
            }
            None => url,
        };

        if path.is_empty() {
            return Err("Database path cannot be empty".to_string());
        }

        Ok(Self::new(path))
    }

    /// Convert to connection string
    pub fn to_url(&self) -> String {
        if self.is_in_memory() {
            MEMORY_URL.to_string()
        } else {
            format!("{}{}", URL_SCHEME, self.path)
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.path.is_empty() {
            return Err("Database path cannot be empty".to_string());
        }

        if self.read_only && self.is_in_memory() {
            return Err("An in-memory database cannot be opened read-only".to_string());
        }

        Ok(())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConnectionConfig::default();
        assert!(config.is_in_memory());
        assert!(!config.read_only);
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_builder_pattern() {
        let config = ConnectionConfig::new("app.db")
            .read_only(true)
            .busy_timeout(Duration::from_millis(250))
            .foreign_keys(false);

        assert_eq!(config.path, "app.db");
        assert!(config.read_only);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(!config.foreign_keys);
    }

    #[test]
    fn test_from_url() {
        let config = ConnectionConfig::from_url("sqlite://data/docs.db").unwrap();
        assert_eq!(config.path, "data/docs.db");

        let memory = ConnectionConfig::from_url("sqlite::memory:").unwrap();
        assert!(memory.is_in_memory());

        let bare = ConnectionConfig::from_url("docs.db").unwrap();
        assert_eq!(bare.path, "docs.db");
    }

    #[test]
    fn test_invalid_url() {
        assert!(ConnectionConfig::from_url("mysql://host/db").is_err());
        assert!(ConnectionConfig::from_url("sqlite://").is_err());
    }

    #[test]
    fn test_validate() {
        assert!(ConnectionConfig::new("docs.db").validate().is_ok());
        assert!(ConnectionConfig::new("").validate().is_err());
        assert!(ConnectionConfig::in_memory().read_only(true).validate().is_err());
    }

    #[test]
    fn test_url_round_trip() {
        let config = ConnectionConfig::new("docs.db");
        assert_eq!(config.to_url(), "sqlite://docs.db");
        assert_eq!(ConnectionConfig::in_memory().to_url(), "sqlite::memory:");
    }
}
