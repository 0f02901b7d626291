use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Title written when a file carries no title tag.
pub const UNKNOWN_TITLE: &str = "Unknown";

/// Track length in seconds, kept in whatever form the caller supplied.
///
/// Playlist lines reproduce it verbatim, so `120.5` stays `120.5` and a
/// string such as `"95"` is written as `95`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum TrackDuration {
    Seconds(serde_json::Number),
    Text(String),
}

impl TrackDuration {
    /// Seconds rounded to two decimals. `None` for NaN or infinity.
    pub fn from_secs_f64(secs: f64) -> Option<Self> {
        let rounded = (secs * 100.0).round() / 100.0;
        serde_json::Number::from_f64(rounded).map(Self::Seconds)
    }
}

impl fmt::Display for TrackDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One audio file as the metadata reader reports it and as playlists store it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrackMetadata {
    #[schemars(description = "Absolute, canonical path of the audio file")]
    pub file_path: String,
    #[schemars(description = "Track title, or \"Unknown\" when the file has none")]
    pub title: String,
    #[schemars(description = "Length in seconds (number or numeric string)")]
    pub duration: TrackDuration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_rounds_to_two_decimals() {
        let d = TrackDuration::from_secs_f64(201.34567).unwrap();
        assert_eq!(d.to_string(), "201.35");
    }

    #[test]
    fn duration_rejects_nan() {
        assert!(TrackDuration::from_secs_f64(f64::NAN).is_none());
    }

    #[test]
    fn duration_accepts_number_or_string() {
        let m: TrackMetadata = serde_json::from_str(
            r#"{"file_path": "/m/a.mp3", "title": "A", "duration": 120.5}"#,
        )
        .unwrap();
        assert_eq!(m.duration.to_string(), "120.5");

        let m: TrackMetadata = serde_json::from_str(
            r#"{"file_path": "/m/b.mp3", "title": "B", "duration": "95"}"#,
        )
        .unwrap();
        assert_eq!(m.duration, TrackDuration::Text("95".to_string()));
        assert_eq!(m.duration.to_string(), "95");
    }

    #[test]
    fn integer_duration_is_not_reformatted() {
        let m: TrackMetadata =
            serde_json::from_str(r#"{"file_path": "/m/c.mp3", "title": "C", "duration": 240}"#)
                .unwrap();
        assert_eq!(m.duration.to_string(), "240");
    }
}
