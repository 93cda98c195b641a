//! Startup and shutdown hooks
//!
//! Each hook appends one line to the events log (`events.log_file`).

use std::io;

use crate::config::Config;
use crate::logger::{self, writer};

pub const STARTUP_EVENT: &str = "Application startup";
pub const SHUTDOWN_EVENT: &str = "Application shutdown";

fn record(config: &Config, event: &str) -> io::Result<()> {
    writer::append_line(&config.events.log_file, event)?;
    logger::log_info(&format!("[Event] {event}"));
    Ok(())
}

/// Runs before the listener is bound
pub fn on_startup(config: &Config) -> io::Result<()> {
    record(config, STARTUP_EVENT)
}

/// Runs after in-flight connections drained or timed out
pub fn on_shutdown(config: &Config) -> io::Result<()> {
    record(config, SHUTDOWN_EVENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;

    #[test]
    fn test_hooks_append_in_order() {
        let path = std::env::temp_dir()
            .join(format!("tutorial-endpoints-{}-events.log", std::process::id()))
            .to_string_lossy()
            .into_owned();
        let _ = std::fs::remove_file(&path);

        let mut config = test_config();
        config.events.log_file.clone_from(&path);

        on_startup(&config).unwrap();
        on_shutdown(&config).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Application startup\nApplication shutdown\n");
        let _ = std::fs::remove_file(&path);
    }
}
