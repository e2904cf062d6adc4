#![forbid(unsafe_code)]

//! Occupancy records as delivered by the timetable backend.
//!
//! The backend returns one row per (group × slot). Text fields are read
//! leniently: `null` becomes an empty string and numbers are stringified, so
//! a sparse record still decodes. Fields this crate does not model are kept
//! in [`LessonOccupancy::extra`].

use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Recurrence pattern of a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekType {
    /// Every week.
    Permanent,
    /// Odd ("upper") weeks.
    Upper,
    /// Even ("lower") weeks.
    Lower,
    /// Missing or unrecognized.
    #[default]
    Unknown,
}

impl WeekType {
    /// Parse a week type name, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "permanent" => Self::Permanent,
            "upper" => Self::Upper,
            "lower" => Self::Lower,
            _ => Self::Unknown,
        }
    }

    /// Lowercase wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Permanent => "permanent",
            Self::Upper => "upper",
            Self::Lower => "lower",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for WeekType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for WeekType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = Option::<String>::deserialize(deserializer)?;
        Ok(name.as_deref().map_or(Self::Unknown, Self::parse))
    }
}

/// One occupancy row for a (day, hour) slot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LessonOccupancy {
    #[serde(deserialize_with = "lenient_text")]
    pub lesson_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub lesson_type_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub teacher_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub teacher_surname: String,
    pub week_type_name: WeekType,
    #[serde(deserialize_with = "lenient_text")]
    pub group_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub room_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub corp_id: String,
    /// Unmodeled fields, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LessonOccupancy {
    /// Record for a lesson attended by one group.
    pub fn new(lesson_name: impl Into<String>, week: WeekType, group_name: impl Into<String>) -> Self {
        Self {
            lesson_name: lesson_name.into(),
            week_type_name: week,
            group_name: group_name.into(),
            ..Self::default()
        }
    }

    /// Set the lesson type (builder).
    #[must_use]
    pub fn with_type(mut self, lesson_type_name: impl Into<String>) -> Self {
        self.lesson_type_name = lesson_type_name.into();
        self
    }

    /// Set the teacher (builder).
    #[must_use]
    pub fn with_teacher(mut self, name: impl Into<String>, surname: impl Into<String>) -> Self {
        self.teacher_name = name.into();
        self.teacher_surname = surname.into();
        self
    }

    /// Set the room (builder).
    #[must_use]
    pub fn with_room(mut self, room_name: impl Into<String>, corp_id: impl Into<String>) -> Self {
        self.room_name = room_name.into();
        self.corp_id = corp_id.into();
        self
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(de::Error::custom(format!("expected text, found {other}"))),
    }
}

// ---------------------------------------------------------------------------
// Schedule envelope
// ---------------------------------------------------------------------------

/// Error decoding an occupancy payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Payload was not `{days}` or `{data: {days}}`.
    UnexpectedShape(String),
    /// Payload had the right shape but a field failed to decode.
    Decode(String),
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedShape(what) => write!(f, "unexpected occupancy shape: {what}"),
            Self::Decode(msg) => write!(f, "could not decode occupancy: {msg}"),
        }
    }
}

impl std::error::Error for ScheduleError {}

impl From<serde_json::Error> for ScheduleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Occupancy for one hour of one day.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourOccupancy {
    pub hour_id: u32,
    #[serde(default)]
    pub lessons: Vec<LessonOccupancy>,
}

/// Occupancy for one day.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayOccupancy {
    pub day_id: u32,
    #[serde(default)]
    pub hours: Vec<HourOccupancy>,
}

/// A room's or teacher's weekly occupancy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OccupancySchedule {
    #[serde(default)]
    pub days: Vec<DayOccupancy>,
}

impl OccupancySchedule {
    /// Decode from a JSON value: `{days}`, `{data: {days}}`, or `{data: null}`.
    pub fn from_value(payload: Value) -> Result<Self, ScheduleError> {
        let Value::Object(mut obj) = payload else {
            return Err(ScheduleError::UnexpectedShape("not an object".to_string()));
        };
        if obj.contains_key("days") {
            return Ok(serde_json::from_value(Value::Object(obj))?);
        }
        match obj.remove("data") {
            Some(Value::Null) => Ok(Self::default()),
            Some(inner @ Value::Object(_)) => Self::from_value(inner),
            Some(_) => Err(ScheduleError::UnexpectedShape(
                "`data` is not an object".to_string(),
            )),
            None => Err(ScheduleError::UnexpectedShape(
                "object without `days`".to_string(),
            )),
        }
    }

    /// Decode from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ScheduleError> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Every slot with its records, in payload order. A slot listed twice
    /// yields twice.
    pub fn slots(&self) -> impl Iterator<Item = (u32, u32, &[LessonOccupancy])> + '_ {
        self.days.iter().flat_map(|day| {
            day.hours
                .iter()
                .map(move |hour| (day.day_id, hour.hour_id, hour.lessons.as_slice()))
        })
    }

    /// All records for a slot, gathered across duplicate listings.
    #[must_use]
    pub fn lessons_at(&self, day_id: u32, hour_id: u32) -> Vec<&LessonOccupancy> {
        self.slots()
            .filter(|(d, h, _)| *d == day_id && *h == hour_id)
            .flat_map(|(_, _, lessons)| lessons.iter())
            .collect()
    }

    /// Total number of records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.slots().map(|(_, _, lessons)| lessons.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn week_type_parsing() {
        assert_eq!(WeekType::parse("Upper "), WeekType::Upper);
        assert_eq!(WeekType::parse("permanent"), WeekType::Permanent);
        assert_eq!(WeekType::parse("biweekly"), WeekType::Unknown);
        let w: WeekType = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(w, WeekType::Unknown);
        assert_eq!(serde_json::to_value(WeekType::Lower).unwrap(), json!("lower"));
    }

    #[test]
    fn record_decodes_leniently() {
        let record: LessonOccupancy = serde_json::from_value(json!({
            "lessonName": "Math",
            "lessonTypeName": null,
            "teacherName": "Olena",
            "teacherSurname": "Ivanenko",
            "weekTypeName": "upper",
            "groupName": "KN-21",
            "roomName": 101,
            "corpId": 2,
            "lessonId": 17
        }))
        .unwrap();
        assert_eq!(record.lesson_type_name, "");
        assert_eq!(record.room_name, "101");
        assert_eq!(record.corp_id, "2");
        assert_eq!(record.week_type_name, WeekType::Upper);
        assert_eq!(record.extra.get("lessonId"), Some(&json!(17)));
    }

    #[test]
    fn missing_fields_default() {
        let record: LessonOccupancy = serde_json::from_value(json!({"lessonName": "Art"})).unwrap();
        assert_eq!(record.week_type_name, WeekType::Unknown);
        assert!(record.group_name.is_empty());
    }

    #[test]
    fn structured_text_field_is_rejected() {
        let err = serde_json::from_value::<LessonOccupancy>(json!({"lessonName": ["x"]}));
        assert!(err.is_err());
    }

    #[test]
    fn envelope_shapes() {
        let days = json!({"days": [{"dayId": 1, "hours": [{"hourId": 2, "lessons": []}]}]});
        let direct = OccupancySchedule::from_value(days.clone()).unwrap();
        let wrapped = OccupancySchedule::from_value(json!({"data": days})).unwrap();
        assert_eq!(direct, wrapped);
        assert_eq!(direct.days[0].hours[0].hour_id, 2);

        let empty = OccupancySchedule::from_value(json!({"data": null})).unwrap();
        assert!(empty.days.is_empty());

        assert!(matches!(
            OccupancySchedule::from_value(json!([])),
            Err(ScheduleError::UnexpectedShape(_))
        ));
        assert!(matches!(
            OccupancySchedule::from_value(json!({"rooms": []})),
            Err(ScheduleError::UnexpectedShape(_))
        ));
        assert!(matches!(
            OccupancySchedule::from_value(json!({"days": [{"hours": []}]})),
            Err(ScheduleError::Decode(_))
        ));
        assert!(matches!(
            OccupancySchedule::from_json_str("{"),
            Err(ScheduleError::Decode(_))
        ));
    }

    #[test]
    fn duplicate_slot_listings_are_gathered() {
        let schedule = OccupancySchedule::from_value(json!({"days": [
            {"dayId": 1, "hours": [
                {"hourId": 1, "lessons": [{"lessonName": "A", "groupName": "G1"}]},
                {"hourId": 1, "lessons": [{"lessonName": "A", "groupName": "G2"}]}
            ]}
        ]}))
        .unwrap();
        assert_eq!(schedule.lessons_at(1, 1).len(), 2);
        assert!(schedule.lessons_at(2, 1).is_empty());
        assert_eq!(schedule.record_count(), 2);
    }
}
