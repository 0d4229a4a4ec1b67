use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single live probe against a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 2xx response whose body was read in full.
    Reachable { status: u16 },
    /// The server answered with a non-success status.
    Status { status: u16 },
    TimedOut,
    /// Connection, TLS, redirect or body-read failure.
    Failed(String),
}

/// Why a link was judged broken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum BreakReason {
    Status(u16),
    Timeout,
    Network(String),
}

impl BreakReason {
    /// True when the server itself said the page is gone (404 or 410).
    /// Everything else may be a transient or client-side failure.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, BreakReason::Status(404) | BreakReason::Status(410))
    }

    pub fn label(&self) -> String {
        match self {
            BreakReason::Status(status) => format!("HTTP {}", status),
            BreakReason::Timeout => "timeout".to_string(),
            BreakReason::Network(message) => format!("network error: {}", message),
        }
    }
}

impl fmt::Display for BreakReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Verdict for one candidate link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkVerdict {
    /// Present in the authoritative index; no probe was issued.
    Indexed,
    /// Absent from the index but the live probe succeeded.
    Reachable { status: u16 },
    Broken(BreakReason),
}

impl LinkVerdict {
    pub fn is_valid(&self) -> bool {
        !matches!(self, LinkVerdict::Broken(_))
    }
}

impl From<ProbeOutcome> for LinkVerdict {
    fn from(outcome: ProbeOutcome) -> Self {
        match outcome {
            ProbeOutcome::Reachable { status } => LinkVerdict::Reachable { status },
            ProbeOutcome::Status { status } => LinkVerdict::Broken(BreakReason::Status(status)),
            ProbeOutcome::TimedOut => LinkVerdict::Broken(BreakReason::Timeout),
            ProbeOutcome::Failed(message) => LinkVerdict::Broken(BreakReason::Network(message)),
        }
    }
}

/// A ranked replacement candidate for a broken URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub url: String,
    /// Similarity in [0, 1].
    pub confidence: f64,
}

impl Suggestion {
    pub fn new(url: String, confidence: f64) -> Self {
        Self { url, confidence }
    }

    /// Confidence as a rounded 0-100 integer percentage.
    pub fn percent(&self) -> u8 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_outcome_to_verdict() {
        assert_eq!(
            LinkVerdict::from(ProbeOutcome::Reachable { status: 200 }),
            LinkVerdict::Reachable { status: 200 }
        );
        assert_eq!(
            LinkVerdict::from(ProbeOutcome::Status { status: 404 }),
            LinkVerdict::Broken(BreakReason::Status(404))
        );
        assert_eq!(
            LinkVerdict::from(ProbeOutcome::TimedOut),
            LinkVerdict::Broken(BreakReason::Timeout)
        );
        assert!(!LinkVerdict::from(ProbeOutcome::Failed("refused".into())).is_valid());
        assert!(LinkVerdict::Indexed.is_valid());
    }

    #[test]
    fn test_break_reason_confirmed() {
        assert!(BreakReason::Status(404).is_confirmed());
        assert!(BreakReason::Status(410).is_confirmed());
        assert!(!BreakReason::Status(500).is_confirmed());
        assert!(!BreakReason::Timeout.is_confirmed());
        assert!(!BreakReason::Network("dns".into()).is_confirmed());
    }

    #[test]
    fn test_suggestion_percent_rounds() {
        assert_eq!(Suggestion::new("u".into(), 0.0).percent(), 0);
        assert_eq!(Suggestion::new("u".into(), 0.875).percent(), 88);
        assert_eq!(Suggestion::new("u".into(), 1.0).percent(), 100);
    }
}
