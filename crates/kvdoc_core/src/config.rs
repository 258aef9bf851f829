//! Store and connection configuration.

/// Key prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "kvdoc";

/// Configuration for a collection store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Prefix applied to every generated key name.
    pub prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the key prefix. An empty prefix keeps the current one.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        if !prefix.is_empty() {
            self.prefix = prefix;
        }
        self
    }
}

/// Configuration for registering a named connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Name the connection is registered under.
    pub identity: String,
    /// Key prefix for this connection. `None` uses [`DEFAULT_PREFIX`].
    pub prefix: Option<String>,
}

impl ConnectionConfig {
    /// Creates a configuration for the given identity.
    #[must_use]
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            prefix: None,
        }
    }

    /// Sets the key prefix.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Builds the store configuration for this connection.
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        match &self.prefix {
            Some(prefix) => StoreConfig::new().prefix(prefix.clone()),
            None => StoreConfig::new(),
        }
    }
}
