use std::{fmt::Display, sync::Arc};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a person as provided by the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(Arc<str>);

/// Identifier of the card every piece of state is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(Arc<str>);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.into())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value.into())
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(MemberId);
string_id!(CardId);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: MemberId,
    pub display_name: Arc<str>,
}

impl Member {
    pub fn new(id: impl Into<MemberId>, display_name: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// The in-progress session of a member on a card. There is at most one per pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub member_id: MemberId,
    pub card_id: CardId,
    pub start: DateTime<Utc>,
}

/// A completed session. `day` is the local date of `start`, so a session running past midnight
/// is attributed entirely to the day it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    pub member_id: MemberId,
    pub card_id: CardId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: i64,
    pub day: NaiveDate,
}

/// What is stored under a member key inside a card scope. Field names follow the layout other
/// clients of the same store already read.
#[derive(PartialEq, Eq, Debug, Default, Serialize, Deserialize, Clone)]
pub struct MemberRecordEntity {
    #[serde(default)]
    pub active: Option<DateTime<Utc>>,
    #[serde(default)]
    pub log: Vec<SessionEntryEntity>,
}

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntryEntity {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: i64,
    pub day: NaiveDate,
}

impl SessionEntry {
    pub fn from_entity(member_id: MemberId, card_id: CardId, entity: SessionEntryEntity) -> Self {
        let SessionEntryEntity {
            start,
            end,
            duration_minutes,
            day,
        } = entity;
        Self {
            member_id,
            card_id,
            start,
            end,
            duration_minutes,
            day,
        }
    }
}

impl From<&SessionEntry> for SessionEntryEntity {
    fn from(entry: &SessionEntry) -> Self {
        Self {
            start: entry.start,
            end: entry.end,
            duration_minutes: entry.duration_minutes,
            day: entry.day,
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::json;

    use super::{MemberRecordEntity, SessionEntryEntity};

    #[test]
    fn test_member_record_layout() -> Result<()> {
        let record = MemberRecordEntity {
            active: Some(Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap()),
            log: vec![SessionEntryEntity {
                start: Utc.with_ymd_and_hms(2025, 3, 14, 7, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2025, 3, 14, 7, 30, 0).unwrap(),
                duration_minutes: 30,
                day: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            }],
        };

        assert_eq!(
            serde_json::to_value(&record)?,
            json!({
                "active": "2025-03-14T09:00:00Z",
                "log": [{
                    "start": "2025-03-14T07:00:00Z",
                    "end": "2025-03-14T07:30:00Z",
                    "durationMinutes": 30,
                    "day": "2025-03-14",
                }],
            })
        );
        Ok(())
    }

    #[test]
    fn test_member_record_missing_fields_default() -> Result<()> {
        let record: MemberRecordEntity = serde_json::from_value(json!({}))?;
        assert_eq!(record, MemberRecordEntity::default());

        let record: MemberRecordEntity = serde_json::from_value(json!({"active": null}))?;
        assert_eq!(record.active, None);
        Ok(())
    }
}
