use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::store::{Store, StoreError};

use super::{
    entities::{CardId, MemberId, MemberRecordEntity, SessionEntry},
    error::EngineError,
    state_machine::MemberRecord,
};

pub const KEY_PREFIX: &str = "timecard:";

/// How many times a write is re-evaluated after losing a race before giving up.
const MAX_COMMIT_ATTEMPTS: usize = 3;

/// Key of a member's record inside a card scope.
pub fn member_key(member_id: &MemberId) -> String {
    format!("{KEY_PREFIX}{member_id}")
}

/// Typed access to [MemberRecord]s over a raw [Store]. The card is the scope, the member the
/// key.
pub struct MemberRecords<S> {
    store: S,
}

impl<S: Store> MemberRecords<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn load(
        &self,
        member_id: &MemberId,
        card_id: &CardId,
    ) -> Result<MemberRecord, EngineError> {
        let (record, _) = self.load_raw(member_id, card_id).await?;
        Ok(record)
    }

    /// Applies `apply` to the freshest record and commits the result if it changed. The write is
    /// conditional on the record being unchanged since it was read; when another writer got in
    /// between, the record is read again and `apply` re-run against it.
    pub async fn update<R, F>(
        &self,
        member_id: &MemberId,
        card_id: &CardId,
        mut apply: F,
    ) -> Result<R, EngineError>
    where
        F: FnMut(&mut MemberRecord) -> R,
    {
        let key = member_key(member_id);
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let (before, raw) = self.load_raw(member_id, card_id).await?;
            let mut record = before.clone();
            let result = apply(&mut record);
            if record == before {
                return Ok(result);
            }

            let value =
                serde_json::to_value(record.to_entity()).map_err(|source| StoreError::Encode {
                    scope: card_id.to_string(),
                    key: key.clone(),
                    source,
                })?;
            if self
                .store
                .compare_and_set(card_id.as_str(), &key, raw.as_ref(), value)
                .await?
            {
                debug!("Committed {key} in {card_id} on attempt {attempt}");
                return Ok(result);
            }
            warn!("Record {key} in {card_id} changed while writing, retrying (attempt {attempt})");
        }

        Err(StoreError::Conflict {
            scope: card_id.to_string(),
            key,
            attempts: MAX_COMMIT_ATTEMPTS,
        }
        .into())
    }

    /// Appends a completed entry to the member's log without touching the open session.
    pub async fn append_entry(&self, entry: SessionEntry) -> Result<(), EngineError> {
        let member_id = entry.member_id.clone();
        let card_id = entry.card_id.clone();
        self.update(&member_id, &card_id, |record| {
            record.log.append(entry.clone());
        })
        .await
    }

    async fn load_raw(
        &self,
        member_id: &MemberId,
        card_id: &CardId,
    ) -> Result<(MemberRecord, Option<Value>), EngineError> {
        let key = member_key(member_id);
        let raw = self.store.get(card_id.as_str(), &key).await?;
        let entity = match &raw {
            Some(value) => MemberRecordEntity::deserialize(value).map_err(|source| {
                StoreError::Decode {
                    scope: card_id.to_string(),
                    key,
                    source,
                }
            })?,
            None => MemberRecordEntity::default(),
        };
        Ok((
            MemberRecord::from_entity(member_id.clone(), card_id.clone(), entity),
            raw,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use serde_json::{json, Value};

    use crate::{
        engine::{entities::SessionEntry, error::EngineError},
        store::{memory::MemoryStore, Store, StoreError},
        utils::logging::TEST_LOGGING,
    };

    use super::{member_key, MemberRecords};

    /// Store that lets a second writer sneak in right before the first compare-and-set.
    struct RacingStore {
        inner: MemoryStore,
        interleaved: AtomicUsize,
        interleave_times: usize,
    }

    #[async_trait]
    impl Store for RacingStore {
        async fn get(&self, scope: &str, key: &str) -> Result<Option<Value>, StoreError> {
            self.inner.get(scope, key).await
        }

        async fn set(&self, scope: &str, key: &str, value: Value) -> Result<(), StoreError> {
            self.inner.set(scope, key, value).await
        }

        async fn compare_and_set(
            &self,
            scope: &str,
            key: &str,
            expected: Option<&Value>,
            value: Value,
        ) -> Result<bool, StoreError> {
            let count = self.interleaved.fetch_add(1, Ordering::SeqCst);
            if count < self.interleave_times {
                let mut current = self
                    .inner
                    .get(scope, key)
                    .await?
                    .unwrap_or_else(|| json!({"active": null, "log": []}));
                current["log"].as_array_mut().unwrap().push(json!({
                    "start": "2025-03-14T07:00:00Z",
                    "end": "2025-03-14T07:10:00Z",
                    "durationMinutes": 10,
                    "day": "2025-03-14",
                }));
                self.inner.set(scope, key, current).await?;
            }
            self.inner
                .compare_and_set(scope, key, expected, value)
                .await
        }
    }

    fn entry(minutes: i64) -> SessionEntry {
        let start = Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap();
        SessionEntry {
            member_id: "ada".into(),
            card_id: "card".into(),
            start,
            end: start + Duration::minutes(minutes),
            duration_minutes: minutes,
            day: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_absent_record_is_empty() -> Result<()> {
        let records = MemberRecords::new(MemoryStore::new());
        let record = records.load(&"ada".into(), &"card".into()).await?;
        assert_eq!(record.active, None);
        assert!(record.log.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_append_entry_writes_member_key() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let records = MemberRecords::new(store.clone());
        records.append_entry(entry(30)).await?;
        records.append_entry(entry(45)).await?;

        let stored = store.get("card", &member_key(&"ada".into())).await?.unwrap();
        assert_eq!(stored["log"].as_array().unwrap().len(), 2);
        assert_eq!(stored["log"][1]["durationMinutes"], json!(45));
        assert_eq!(stored["active"], Value::Null);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_append_is_not_lost() -> Result<()> {
        *TEST_LOGGING;
        let store = Arc::new(RacingStore {
            inner: MemoryStore::new(),
            interleaved: AtomicUsize::new(0),
            interleave_times: 1,
        });
        let records = MemberRecords::new(store.clone());
        records.append_entry(entry(30)).await?;

        let record = records.load(&"ada".into(), &"card".into()).await?;
        let minutes = record
            .log
            .entries()
            .iter()
            .map(|e| e.duration_minutes)
            .collect::<Vec<_>>();
        assert_eq!(minutes, vec![10, 30]);
        Ok(())
    }

    #[tokio::test]
    async fn test_gives_up_after_repeated_conflicts() -> Result<()> {
        *TEST_LOGGING;
        let store = Arc::new(RacingStore {
            inner: MemoryStore::new(),
            interleaved: AtomicUsize::new(0),
            interleave_times: usize::MAX,
        });
        let records = MemberRecords::new(store.clone());

        let result = records.append_entry(entry(30)).await;
        assert!(matches!(
            result,
            Err(EngineError::Persistence(StoreError::Conflict { attempts: 3, .. }))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_undecodable_record_is_persistence_failure() -> Result<()> {
        *TEST_LOGGING;
        let store = Arc::new(MemoryStore::new());
        store
            .set("card", &member_key(&"ada".into()), json!({"active": 42}))
            .await?;
        let records = MemberRecords::new(store);

        let result = records.load(&"ada".into(), &"card".into()).await;
        assert!(matches!(
            result,
            Err(EngineError::Persistence(StoreError::Decode { .. }))
        ));
        Ok(())
    }
}
