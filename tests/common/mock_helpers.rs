//! Session construction helpers

use super::test_timeout;
use crossbeam_channel::Sender;
use std::sync::Arc;
use thermolog::link::{ReadOutcome, ScriptedConnector};
use thermolog::{AppConfig, Session};

/// Port name used by the helpers
pub const TEST_PORT: &str = "TEST0";

/// Config with a short read timeout
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.serial = config.serial.with_read_timeout(test_timeout());
    config
}

/// Session connected to a port that replays `script`, then stays silent
pub fn scripted_session(script: Vec<ReadOutcome>) -> Session {
    let connector = ScriptedConnector::new().with_script(TEST_PORT, script);
    let mut session = Session::new(Arc::new(connector), &test_config());
    assert!(session.connect(TEST_PORT).is_connected());
    session
}

/// Session connected to a port fed through the returned sender
pub fn fed_session() -> (Session, Sender<String>) {
    let (connector, feed) = ScriptedConnector::new().with_feed(TEST_PORT);
    let mut session = Session::new(Arc::new(connector), &test_config());
    assert!(session.connect(TEST_PORT).is_connected());
    (session, feed)
}
