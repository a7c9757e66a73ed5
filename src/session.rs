use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A time-indexed annotation inside a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A recorded activity interval with metadata and optional markers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Elapsed milliseconds; authoritative once `end_time` is set
    #[serde(rename = "duration")]
    pub duration_ms: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<Marker>,
}

impl Session {
    /// Create a fresh session starting now
    pub fn begin(title: &str, description: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: description.to_string(),
            start_time: Utc::now(),
            end_time: None,
            duration_ms: 0,
            markers: Vec::new(),
        }
    }

    /// Append a marker stamped with the current time
    pub fn add_marker(&mut self, label: &str) -> &Marker {
        let marker = Marker {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            label: label.to_string(),
            notes: None,
        };
        self.markers.push(marker);
        // just pushed, cannot be empty
        self.markers.last().unwrap()
    }

    /// Close the session: stamp `end_time` and fix the authoritative duration
    pub fn finalize(&mut self) {
        let end = Utc::now();
        self.duration_ms = (end - self.start_time).num_milliseconds();
        self.end_time = Some(end);
    }

    pub fn is_finalized(&self) -> bool {
        self.end_time.is_some()
    }

    /// Milliseconds between `start_time` and `now`
    pub fn elapsed_ms_at(&self, now: DateTime<Utc>) -> i64 {
        (now - self.start_time).num_milliseconds()
    }
}
