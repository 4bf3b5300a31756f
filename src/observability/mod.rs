//! Observability subsystem
//!
//! - Structured logging (JSON lines on stderr)
//! - Counter metrics
//! - Durable, append-only audit log
//!
//! # Principles
//!
//! 1. Observability is read-only: it never changes what an operation does
//! 2. No async or background threads
//! 3. Deterministic output

pub mod audit;
mod events;
mod logger;
mod metrics;

pub use audit::{
    AuditAction, AuditEntry, AuditFault, AuditLog, AuditOutcome, FileAuditLog, MemoryAuditLog,
};
pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log an event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log an event with fields at its own severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::StoreOpened);
        log_event_with_fields(Event::ConfigLoaded, &[("data_dir", "/tmp/test")]);
    }
}
