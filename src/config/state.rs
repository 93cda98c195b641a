// Application state module
// Shared runtime state handed to every connection

use super::types::Config;
use crate::store::{ItemStore, TaskStore};

/// Application state
pub struct AppState {
    pub config: Config,

    pub items: ItemStore,
    pub tasks: TaskStore,
}

impl AppState {
    /// Create `AppState` with freshly seeded stores
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            items: ItemStore::seeded(),
            tasks: TaskStore::seeded(),
        }
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;

    #[test]
    fn test_access_log_flag_follows_config() {
        let mut config = test_config();
        assert!(AppState::new(&config).access_log_enabled());
        config.logging.access_log = false;
        assert!(!AppState::new(&config).access_log_enabled());
    }
}
