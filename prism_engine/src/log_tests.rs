//! Unit tests for log.rs and the Engine logging entry point
//!
//! Tests that swap the global logger are serialized; captured entries are
//! filtered by a test-specific source because other tests keep logging in parallel.

use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
use crate::engine::Engine;
use crate::error::Error;
use serial_test::serial;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Logger that stores every entry for inspection
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn install_capture() -> Arc<Mutex<Vec<LogEntry>>> {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(CaptureLogger { entries: Arc::clone(&entries) });
    entries
}

fn from_source(entries: &Arc<Mutex<Vec<LogEntry>>>, source: &str) -> Vec<LogEntry> {
    entries
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.source == source)
        .cloned()
        .collect()
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_debug() {
    assert_eq!(format!("{:?}", LogSeverity::Trace), "Trace");
    assert_eq!(format!("{:?}", LogSeverity::Error), "Error");
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_format_plain_without_location() {
    let entry = LogEntry {
        severity: LogSeverity::Info,
        timestamp: SystemTime::now(),
        source: "prism::frame".to_string(),
        message: "Swapchain rebuilt".to_string(),
        file: None,
        line: None,
    };

    let line = DefaultLogger::format_plain(&entry);
    assert!(line.contains("[INFO ]"));
    assert!(line.contains("[prism::frame]"));
    assert!(line.ends_with("Swapchain rebuilt"));
}

#[test]
fn test_format_plain_with_location() {
    let entry = LogEntry {
        severity: LogSeverity::Error,
        timestamp: SystemTime::now(),
        source: "prism::vulkan".to_string(),
        message: "Device lost".to_string(),
        file: Some("vulkan_device.rs"),
        line: Some(42),
    };

    let line = DefaultLogger::format_plain(&entry);
    assert!(line.contains("[ERROR]"));
    assert!(line.ends_with("(vulkan_device.rs:42)"));
}

#[test]
fn test_default_logger_does_not_panic() {
    let entry = LogEntry {
        severity: LogSeverity::Warn,
        timestamp: SystemTime::now(),
        source: "prism::test".to_string(),
        message: "console output".to_string(),
        file: None,
        line: None,
    };
    DefaultLogger.log(&entry);
}

// ============================================================================
// ENGINE DISPATCH TESTS
// ============================================================================

#[test]
#[serial]
fn test_macros_route_to_custom_logger() {
    let entries = install_capture();

    crate::engine_info!("prism::test::route", "frame {}", 7);
    crate::engine_warn!("prism::test::route", "slow frame");

    let captured = from_source(&entries, "prism::test::route");
    assert_eq!(captured.len(), 2);
    assert_eq!(captured[0].severity, LogSeverity::Info);
    assert_eq!(captured[0].message, "frame 7");
    assert_eq!(captured[1].severity, LogSeverity::Warn);
    assert!(captured[0].file.is_none());

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_error_macro_records_location() {
    let entries = install_capture();

    crate::engine_error!("prism::test::location", "broken");

    let captured = from_source(&entries, "prism::test::location");
    assert_eq!(captured.len(), 1);
    assert!(captured[0].file.unwrap().ends_with("log_tests.rs"));
    assert!(captured[0].line.is_some());

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_engine_err_builds_backend_error() {
    let entries = install_capture();

    let err = crate::engine_err!("prism::test::err", "submit failed: {}", "timeout");
    assert_eq!(err, Error::BackendError("submit failed: timeout".to_string()));

    let captured = from_source(&entries, "prism::test::err");
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].severity, LogSeverity::Error);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_engine_bail_returns_early() {
    let _entries = install_capture();

    fn fails() -> crate::error::Result<u32> {
        crate::engine_bail!("prism::test::bail", "bail out");
    }

    assert!(matches!(fails(), Err(Error::BackendError(msg)) if msg == "bail out"));

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_min_severity_filters_entries() {
    let entries = install_capture();

    Engine::set_min_severity(LogSeverity::Warn);
    crate::engine_debug!("prism::test::filter", "hidden");
    crate::engine_warn!("prism::test::filter", "shown");
    Engine::set_min_severity(LogSeverity::Debug);

    let captured = from_source(&entries, "prism::test::filter");
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].message, "shown");

    Engine::reset_logger();
}
