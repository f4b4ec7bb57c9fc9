use std::fmt;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Daily cutoff after which overtime reminders become eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdConfig {
    pub hour: u32,   // 0-23
    pub minute: u32, // 0-59
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            hour: 18,
            minute: 30,
        }
    }
}

impl ThresholdConfig {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    /// True once the local time of day has reached the cutoff.
    /// There is no midnight rollover: 00:10 is never past 18:30.
    pub fn is_past(&self, now: NaiveTime) -> bool {
        now.hour() > self.hour || (now.hour() == self.hour && now.minute() >= self.minute)
    }
}

impl fmt::Display for ThresholdConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// One response from the overtime status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub should_notify: bool,
    pub has_checked_in: bool,
    pub has_checked_out: bool,
}

impl StatusSnapshot {
    /// Checked out, or never checked in: the shown flag must clear.
    pub fn is_reset_condition(&self) -> bool {
        self.has_checked_out || !self.has_checked_in
    }
}

/// Host permission to present notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    #[default]
    Default,
    Granted,
    Denied,
}

impl Permission {
    pub fn is_decided(&self) -> bool {
        !matches!(self, Permission::Default)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Permission::Default => "default",
            Permission::Granted => "granted",
            Permission::Denied => "denied",
        };
        f.write_str(s)
    }
}

/// Everything needed to put the overtime reminder on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OvertimeNotification {
    pub title: String,
    pub body: String,
    pub icon: String,
    /// Presenting again with the same tag replaces the visible notification.
    pub tag: String,
    pub require_interaction: bool,
    /// Opened when the notification is clicked.
    pub click_url: String,
}

/// Result of a single poll, as observed after all state updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollOutcome {
    /// `None` when the request failed.
    pub snapshot: Option<StatusSnapshot>,
    pub presented: bool,
    pub reset: bool,
}

impl PollOutcome {
    pub fn failed() -> Self {
        Self::default()
    }

    /// Format the outcome for display (e.g., "notify=yes checked-in=yes checked-out=no | shown")
    pub fn format_summary(&self) -> String {
        let Some(snap) = self.snapshot else {
            return "status request failed".to_string();
        };
        let yn = |b: bool| if b { "yes" } else { "no" };
        let action = if self.presented && self.reset {
            "shown, then flag reset"
        } else if self.presented {
            "shown"
        } else if self.reset {
            "flag reset"
        } else {
            "no action"
        };
        format!(
            "notify={} checked-in={} checked-out={} | {}",
            yn(snap.should_notify),
            yn(snap.has_checked_in),
            yn(snap.has_checked_out),
            action
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn threshold_boundaries() {
        let t = ThresholdConfig::default();
        assert!(t.is_past(at(18, 30)));
        assert!(!t.is_past(at(18, 29)));
        assert!(!t.is_past(at(17, 59)));
        assert!(t.is_past(at(19, 0)));
        assert!(t.is_past(at(23, 59)));
        assert!(!t.is_past(at(0, 10)));
    }

    #[test]
    fn threshold_matches_predicate_for_every_minute() {
        let t = ThresholdConfig::default();
        for h in 0..24 {
            for m in 0..60 {
                let expected = h > 18 || (h == 18 && m >= 30);
                assert_eq!(t.is_past(at(h, m)), expected, "{h:02}:{m:02}");
            }
        }
    }

    #[test]
    fn midnight_threshold_is_always_past() {
        let t = ThresholdConfig::new(0, 0);
        assert!(t.is_past(at(0, 0)));
        assert!(t.is_past(at(12, 0)));
    }

    #[test]
    fn snapshot_requires_all_fields() {
        let ok: StatusSnapshot = serde_json::from_str(
            r#"{"should_notify": true, "has_checked_in": true, "has_checked_out": false}"#,
        )
        .unwrap();
        assert!(ok.should_notify);
        assert!(!ok.is_reset_condition());

        assert!(serde_json::from_str::<StatusSnapshot>(r#"{"should_notify": true}"#).is_err());
    }

    #[test]
    fn reset_condition() {
        let snap = |i, o| StatusSnapshot {
            should_notify: false,
            has_checked_in: i,
            has_checked_out: o,
        };
        assert!(snap(false, false).is_reset_condition());
        assert!(snap(true, true).is_reset_condition());
        assert!(!snap(true, false).is_reset_condition());
    }

    #[test]
    fn permission_serde_is_lowercase() {
        let p: Permission = serde_json::from_str(r#""denied""#).unwrap();
        assert_eq!(p, Permission::Denied);
        assert_eq!(Permission::Granted.to_string(), "granted");
        assert!(!Permission::Default.is_decided());
    }

    #[test]
    fn summary_of_failed_poll() {
        assert_eq!(PollOutcome::failed().format_summary(), "status request failed");
    }
}
