//! Operator-facing error and abuse reporting.
//!
//! Handlers never put internal detail in responses; anything an operator
//! needs goes through a [`Reporter`]. The default [`TracingReporter`] turns
//! events into structured `tracing` records, which the telemetry layer can
//! forward to an OTLP collector.

use dashmap::DashMap;
use std::{fmt, time::Duration};
use tracing::{error, warn};

use crate::unix_millis;

const ALERT_MEMORY: Duration = Duration::from_secs(60 * 60);
const ALERT_PRUNE_THRESHOLD: usize = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// Sustained password guessing: an identifier crossed the attempt limit.
    AbuseAlert,
    /// Missing or unusable configuration (e.g. no password for a resource).
    Configuration,
    /// A call to an outside service failed.
    Upstream,
    /// Anything unexpected inside a handler.
    Unexpected,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AbuseAlert => "abuse_alert",
            Self::Configuration => "configuration_error",
            Self::Upstream => "upstream_error",
            Self::Unexpected => "unexpected_error",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Event {
    pub kind: EventKind,
    pub severity: Severity,
    pub message: String,
    pub tags: Vec<(&'static str, String)>,
}

impl Event {
    #[must_use]
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        let severity = match kind {
            EventKind::AbuseAlert => Severity::Warning,
            _ => Severity::Error,
        };
        Self {
            kind,
            severity,
            message: message.into(),
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn tag(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.tags.push((key, value.into()));
        self
    }
}

struct Tags<'a>(&'a [(&'static str, String)]);

impl fmt::Display for Tags<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (key, value)) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// Sink for events that need operator attention.
pub trait Reporter: Send + Sync {
    fn capture(&self, event: Event);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn capture(&self, event: Event) {
        let tags = Tags(&event.tags);
        match event.severity {
            Severity::Warning => warn!(
                kind = event.kind.as_str(),
                tags = %tags,
                "{}",
                event.message
            ),
            Severity::Error => error!(
                kind = event.kind.as_str(),
                tags = %tags,
                "{}",
                event.message
            ),
        }
    }
}

/// Forwards abuse alerts at most once per `identifier + cooldown episode`.
pub struct AbuseAlerts {
    reporter: std::sync::Arc<dyn Reporter>,
    sent: DashMap<String, i64>,
}

impl fmt::Debug for AbuseAlerts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbuseAlerts")
            .field("sent", &self.sent.len())
            .finish_non_exhaustive()
    }
}

impl AbuseAlerts {
    #[must_use]
    pub fn new(reporter: std::sync::Arc<dyn Reporter>) -> Self {
        Self {
            reporter,
            sent: DashMap::new(),
        }
    }

    /// Report that `identifier` entered a cooldown that started at
    /// `episode_start` (unix ms). Returns whether an alert was emitted.
    pub fn cooldown_started(&self, identifier: &str, episode_start: i64) -> bool {
        if self.sent.len() > ALERT_PRUNE_THRESHOLD {
            let horizon = unix_millis().saturating_sub(
                i64::try_from(ALERT_MEMORY.as_millis()).unwrap_or(i64::MAX),
            );
            self.sent.retain(|_, started| *started > horizon);
        }

        let key = format!("{identifier}:{episode_start}");
        if self.sent.insert(key, episode_start).is_some() {
            return false;
        }

        self.reporter.capture(
            Event::new(
                EventKind::AbuseAlert,
                "Password attempt limit reached; client placed in cooldown",
            )
            .tag("component", "password-gate")
            .tag("client", identifier)
            .tag("episode_start", episode_start.to_string()),
        );
        true
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingReporter;
    use super::*;
    use std::sync::Arc;

    #[test]
    fn event_severity_follows_kind() {
        assert_eq!(
            Event::new(EventKind::AbuseAlert, "x").severity,
            Severity::Warning
        );
        assert_eq!(
            Event::new(EventKind::Configuration, "x").severity,
            Severity::Error
        );
    }

    #[test]
    fn tags_render_as_key_value_pairs() {
        let event = Event::new(EventKind::Unexpected, "boom")
            .tag("component", "gate")
            .tag("resource_id", "adb");
        assert_eq!(
            Tags(&event.tags).to_string(),
            "component=gate resource_id=adb"
        );
    }

    #[test]
    fn abuse_alert_fires_once_per_episode() {
        let recorder = Arc::new(RecordingReporter::default());
        let alerts = AbuseAlerts::new(recorder.clone());

        assert!(alerts.cooldown_started("10.0.0.1", 1_000));
        assert!(!alerts.cooldown_started("10.0.0.1", 1_000));
        assert!(alerts.cooldown_started("10.0.0.1", 2_000));
        assert!(alerts.cooldown_started("10.0.0.2", 1_000));

        let events = recorder.events();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.kind == EventKind::AbuseAlert));
    }

    #[test]
    fn tracing_reporter_accepts_events() {
        TracingReporter.capture(Event::new(EventKind::Upstream, "voice service down"));
    }
}
