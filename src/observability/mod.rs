//! Observability for the operator
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//!
//! Observability is read-only: it never changes what a reconciliation decides.
//!
//! # Usage
//!
//! ```ignore
//! use zookeeper_operator::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::MemberAdded, &[("unit", "2")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log a lifecycle event
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
