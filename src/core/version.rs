use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Optimistic-lock token reported by the object store.
///
/// Only the sequence takes part in [`Version::different`]; user and time are
/// carried for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    sequence: u64,
    user: Option<String>,
    time: Option<DateTime<Utc>>,
}

impl Version {
    pub fn new(sequence: u64) -> Self {
        Self {
            sequence,
            user: None,
            time: None,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.time
    }

    /// True when the two tokens describe different stored revisions.
    pub fn different(&self, other: &Version) -> bool {
        self.sequence != other.sequence
    }

    /// `SEQ:USER:MILLIS`, with empty segments for absent parts.
    pub(crate) fn enstring(&self) -> String {
        format!(
            "{}:{}:{}",
            self.sequence,
            self.user.as_deref().unwrap_or(""),
            self.time
                .map(|t| t.timestamp_millis().to_string())
                .unwrap_or_default()
        )
    }

    pub(crate) fn destring(input: &str) -> Option<Self> {
        let mut parts = input.splitn(3, ':');
        let sequence = parts.next()?.parse::<u64>().ok()?;
        let user = parts.next().filter(|u| !u.is_empty()).map(str::to_string);
        let time = match parts.next().filter(|t| !t.is_empty()) {
            Some(millis) => Some(Utc.timestamp_millis_opt(millis.parse().ok()?).single()?),
            None => None,
        };
        Some(Self {
            sequence,
            user,
            time,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.sequence)?;
        if let Some(user) = &self.user {
            write!(f, " by {}", user)?;
        }
        Ok(())
    }
}
