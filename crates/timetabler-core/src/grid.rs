//! Weekly time grid generation.
//!
//! The grid is the finite set of bookable [`TimeBlock`]s for one week. It is
//! rebuilt from [`GridConfig`] before every regeneration; block ids are a pure
//! function of the configuration, so writing the grid twice upserts the same
//! rows instead of duplicating them.

use std::collections::HashSet;

use chrono::{Duration, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// `HH:MM` serde format for [`NaiveTime`].
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// One bookable weekly grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBlock {
    pub id: i64,
    pub weekday: Weekday,
    /// Position of `weekday` in the configured weekday list.
    pub weekday_index: u32,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub stop: NaiveTime,
}

impl TimeBlock {
    /// Whether `next` starts exactly when this block stops, on the same day.
    pub fn is_followed_by(&self, next: &TimeBlock) -> bool {
        self.weekday_index == next.weekday_index && self.stop == next.start
    }
}

/// A daily teaching session, e.g. the morning 09:00-13:00.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl SessionConfig {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }
}

/// Shape of the weekly grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_weekdays")]
    pub weekdays: Vec<Weekday>,
    #[serde(default = "default_block_minutes")]
    pub block_minutes: u32,
    #[serde(default = "default_sessions")]
    pub sessions: Vec<SessionConfig>,
}

fn default_weekdays() -> Vec<Weekday> {
    vec![
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ]
}

fn default_block_minutes() -> u32 {
    60
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

fn default_sessions() -> Vec<SessionConfig> {
    vec![
        SessionConfig::new(hm(9, 0), hm(13, 0)),
        SessionConfig::new(hm(14, 0), hm(18, 0)),
    ]
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            weekdays: default_weekdays(),
            block_minutes: default_block_minutes(),
            sessions: default_sessions(),
        }
    }
}

impl GridConfig {
    /// Check the configuration describes a usable grid.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] for empty or duplicated weekdays, a zero
    /// block length, and sessions that are empty, too short for one block,
    /// unsorted, overlapping or touching.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.weekdays.is_empty() {
            return Err(ValidationError::EmptyCollection("grid.weekdays".into()));
        }
        let mut seen = HashSet::new();
        for day in &self.weekdays {
            if !seen.insert(*day) {
                return Err(ValidationError::Duplicate {
                    kind: "weekday".into(),
                    key: day.to_string(),
                });
            }
        }
        if self.block_minutes == 0 || self.block_minutes >= 24 * 60 {
            return Err(ValidationError::InvalidValue {
                field: "grid.block_minutes".into(),
                message: format!("{} is not a usable block length", self.block_minutes),
            });
        }
        if self.sessions.is_empty() {
            return Err(ValidationError::EmptyCollection("grid.sessions".into()));
        }

        let block = Duration::minutes(i64::from(self.block_minutes));
        let mut previous_end: Option<NaiveTime> = None;
        for (i, session) in self.sessions.iter().enumerate() {
            if session.end <= session.start || session.end - session.start < block {
                return Err(ValidationError::InvalidValue {
                    field: format!("grid.sessions[{i}]"),
                    message: format!(
                        "{}-{} cannot hold a {}-minute block",
                        session.start.format(hhmm::FORMAT),
                        session.end.format(hhmm::FORMAT),
                        self.block_minutes
                    ),
                });
            }
            if let Some(prev) = previous_end {
                if session.start <= prev {
                    return Err(ValidationError::InvalidValue {
                        field: format!("grid.sessions[{i}]"),
                        message: "sessions must be sorted and separated by a gap".into(),
                    });
                }
            }
            previous_end = Some(session.end);
        }
        Ok(())
    }

    /// Number of blocks each weekday gets.
    pub fn slots_per_day(&self) -> usize {
        let block = Duration::minutes(i64::from(self.block_minutes.max(1)));
        self.sessions
            .iter()
            .map(|s| session_slots(s, block).count())
            .sum()
    }
}

fn session_slots(
    session: &SessionConfig,
    block: Duration,
) -> impl Iterator<Item = (NaiveTime, NaiveTime)> + '_ {
    let mut cursor = Some(session.start);
    std::iter::from_fn(move || {
        let start = cursor?;
        let (stop, wrapped) = start.overflowing_add_signed(block);
        if wrapped != 0 || stop > session.end || stop <= start {
            cursor = None;
            return None;
        }
        cursor = Some(stop);
        Some((start, stop))
    })
}

/// Build every time block of the week.
///
/// Slots are numbered across all sessions in order; a block's id is
/// `slot_offset * weekdays + weekday_index`. The result is sorted by
/// weekday index, then start time.
pub fn generate_time_blocks(config: &GridConfig) -> Vec<TimeBlock> {
    let days = config.weekdays.len() as i64;
    let block = Duration::minutes(i64::from(config.block_minutes.max(1)));

    let mut blocks = Vec::with_capacity(config.slots_per_day() * config.weekdays.len());
    let mut slot_offset: i64 = 0;
    for session in &config.sessions {
        for (start, stop) in session_slots(session, block) {
            for (weekday_index, weekday) in config.weekdays.iter().enumerate() {
                blocks.push(TimeBlock {
                    id: slot_offset * days + weekday_index as i64,
                    weekday: *weekday,
                    weekday_index: weekday_index as u32,
                    start,
                    stop,
                });
            }
            slot_offset += 1;
        }
    }

    blocks.sort_by_key(|b| (b.weekday_index, b.start));
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn default_grid_has_forty_blocks() {
        let blocks = generate_time_blocks(&GridConfig::default());
        assert_eq!(blocks.len(), 5 * 8);
        assert_eq!(GridConfig::default().slots_per_day(), 8);
    }

    #[test]
    fn ids_follow_offset_times_weekdays_plus_index() {
        let blocks = generate_time_blocks(&GridConfig::default());
        let tue_10 = blocks
            .iter()
            .find(|b| b.weekday == Weekday::Tue && b.start == t(10, 0))
            .unwrap();
        // second slot of the day, second weekday
        assert_eq!(tue_10.id, 1 * 5 + 1);

        let fri_14 = blocks
            .iter()
            .find(|b| b.weekday == Weekday::Fri && b.start == t(14, 0))
            .unwrap();
        assert_eq!(fri_14.id, 4 * 5 + 4);
        assert_eq!(fri_14.stop, t(15, 0));
    }

    #[test]
    fn generation_is_idempotent() {
        let config = GridConfig::default();
        assert_eq!(generate_time_blocks(&config), generate_time_blocks(&config));

        let ids: HashSet<i64> = generate_time_blocks(&config).iter().map(|b| b.id).collect();
        assert_eq!(ids.len(), 40, "ids must be unique");
    }

    #[test]
    fn blocks_are_sorted_by_day_then_start() {
        let blocks = generate_time_blocks(&GridConfig::default());
        for pair in blocks.windows(2) {
            assert!((pair[0].weekday_index, pair[0].start) < (pair[1].weekday_index, pair[1].start));
        }
    }

    #[test]
    fn sessions_are_not_contiguous() {
        let blocks = generate_time_blocks(&GridConfig::default());
        let monday: Vec<_> = blocks.iter().filter(|b| b.weekday == Weekday::Mon).collect();
        let noon = monday.iter().position(|b| b.start == t(12, 0)).unwrap();
        assert!(!monday[noon].is_followed_by(monday[noon + 1]));
        assert!(monday[0].is_followed_by(monday[1]));
    }

    #[test]
    fn partial_trailing_block_is_dropped() {
        let config = GridConfig {
            weekdays: vec![Weekday::Mon],
            block_minutes: 90,
            sessions: vec![SessionConfig::new(t(9, 0), t(13, 0))],
        };
        let blocks = generate_time_blocks(&config);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].stop, t(12, 0));
    }

    #[test]
    fn validate_rejects_bad_configs() {
        let mut config = GridConfig::default();
        config.weekdays.clear();
        assert!(config.validate().is_err());

        let mut config = GridConfig::default();
        config.weekdays.push(Weekday::Mon);
        assert!(matches!(
            config.validate(),
            Err(ValidationError::Duplicate { .. })
        ));

        let mut config = GridConfig::default();
        config.block_minutes = 0;
        assert!(config.validate().is_err());

        let mut config = GridConfig::default();
        config.sessions.reverse();
        assert!(config.validate().is_err());

        let mut config = GridConfig::default();
        config.sessions[0] = SessionConfig::new(t(13, 0), t(9, 0));
        assert!(config.validate().is_err());

        let mut config = GridConfig::default();
        config.sessions = vec![
            SessionConfig::new(t(9, 0), t(13, 0)),
            SessionConfig::new(t(13, 0), t(17, 0)),
        ];
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidValue { ref field, .. }) if field == "grid.sessions[1]"
        ));

        assert!(GridConfig::default().validate().is_ok());
    }

    #[test]
    fn config_uses_hhmm_strings() {
        let json = serde_json::to_value(GridConfig::default()).unwrap();
        assert_eq!(json["sessions"][0]["start"], "09:00");
        assert_eq!(json["weekdays"][0], "Mon");

        let parsed: GridConfig =
            serde_json::from_str(r#"{"sessions":[{"start":"08:30","end":"10:30"}]}"#).unwrap();
        assert_eq!(parsed.sessions[0].start, t(8, 30));
        assert_eq!(parsed.weekdays.len(), 5);
    }
}
