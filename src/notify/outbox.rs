use std::path::PathBuf;

use async_trait::async_trait;
use fs4::tokio::AsyncFileExt;
use serde::{Deserialize, Serialize};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::{debug, warn};

use super::{Notifier, NotifyError};

/// One line of the outbox file.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboxEvent {
    Comment {
        card_id: String,
        text: String,
    },
    Checklist {
        card_id: String,
        checklist_id: String,
        name: String,
    },
    ChecklistItem {
        checklist_id: String,
        text: String,
    },
}

/// [Notifier] that appends every call as a JSON line to a local file, from where a host
/// integration can pick them up.
pub struct OutboxNotifier {
    path: PathBuf,
}

impl OutboxNotifier {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Reads back every event written so far. Lines that can't be parsed are skipped.
    pub async fn events(&self) -> Result<Vec<OutboxEvent>, NotifyError> {
        let mut file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };
        file.lock_shared()?;
        let mut content = String::new();
        let result = file.read_to_string(&mut content).await;
        file.unlock_async().await?;
        result?;
        Ok(self.parse(&content))
    }

    fn parse(&self, content: &str) -> Vec<OutboxEvent> {
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<OutboxEvent>(line) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(
                        "During parsing in path {:?} found illegal json string {}:  {e}",
                        self.path, line
                    );
                    None
                }
            })
            .collect()
    }

    /// Runs `decide` over the current events under an exclusive lock and appends whatever it
    /// returns.
    async fn append_with<R, F>(&self, decide: F) -> Result<R, NotifyError>
    where
        F: FnOnce(&[OutboxEvent]) -> (Option<OutboxEvent>, R) + Send,
    {
        let mut file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .await?;

        file.lock_exclusive()?;
        let result = self.append_with_file(&mut file, decide).await;
        file.unlock_async().await?;
        result
    }

    async fn append_with_file<R, F>(&self, file: &mut File, decide: F) -> Result<R, NotifyError>
    where
        F: FnOnce(&[OutboxEvent]) -> (Option<OutboxEvent>, R) + Send,
    {
        file.rewind().await?;
        let mut content = String::new();
        file.read_to_string(&mut content).await?;
        let events = self.parse(&content);

        let (event, result) = decide(&events);
        if let Some(event) = event {
            let mut buffer = Vec::<u8>::new();
            // Previous writer might have been cut off in the middle of a line.
            if !content.is_empty() && !content.ends_with('\n') {
                buffer.push(b'\n');
            }
            serde_json::to_writer(&mut buffer, &event)?;
            buffer.push(b'\n');
            file.seek(std::io::SeekFrom::End(0)).await?;
            file.write_all(&buffer).await?;
            file.flush().await?;
            debug!("Appended {event:?} to {:?}", self.path);
        }
        Ok(result)
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn post_comment(&self, card_id: &str, text: &str) -> Result<(), NotifyError> {
        let event = OutboxEvent::Comment {
            card_id: card_id.to_owned(),
            text: text.to_owned(),
        };
        self.append_with(|_| (Some(event), ())).await
    }

    async fn ensure_checklist(&self, card_id: &str, name: &str) -> Result<String, NotifyError> {
        self.append_with(|events| {
            let mut count = 0;
            for event in events {
                if let OutboxEvent::Checklist {
                    card_id: existing_card,
                    checklist_id,
                    name: existing_name,
                } = event
                {
                    if existing_card != card_id {
                        continue;
                    }
                    if existing_name.to_lowercase() == name.to_lowercase() {
                        return (None, checklist_id.clone());
                    }
                    count += 1;
                }
            }
            let checklist_id = format!("{card_id}-checklist-{}", count + 1);
            let event = OutboxEvent::Checklist {
                card_id: card_id.to_owned(),
                checklist_id: checklist_id.clone(),
                name: name.to_owned(),
            };
            (Some(event), checklist_id)
        })
        .await
    }

    async fn add_checklist_item(&self, checklist_id: &str, text: &str) -> Result<(), NotifyError> {
        let event = OutboxEvent::ChecklistItem {
            checklist_id: checklist_id.to_owned(),
            text: text.to_owned(),
        };
        self.append_with(|_| (Some(event), ())).await
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::Result;
    use tempfile::tempdir;

    use crate::{notify::Notifier, utils::logging::TEST_LOGGING};

    use super::{OutboxEvent, OutboxNotifier};

    #[tokio::test]
    async fn test_outbox_missing_file_has_no_events() -> Result<()> {
        let dir = tempdir()?;
        let outbox = OutboxNotifier::new(dir.path().join("outbox.jsonl"));
        assert!(outbox.events().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_outbox_records_calls_in_order() -> Result<()> {
        let dir = tempdir()?;
        let outbox = OutboxNotifier::new(dir.path().join("outbox.jsonl"));

        outbox.post_comment("card-1", "hello").await?;
        let checklist_id = outbox.ensure_checklist("card-1", "Time Entries").await?;
        outbox.add_checklist_item(&checklist_id, "item").await?;

        assert_eq!(
            outbox.events().await?,
            vec![
                OutboxEvent::Comment {
                    card_id: "card-1".into(),
                    text: "hello".into(),
                },
                OutboxEvent::Checklist {
                    card_id: "card-1".into(),
                    checklist_id: "card-1-checklist-1".into(),
                    name: "Time Entries".into(),
                },
                OutboxEvent::ChecklistItem {
                    checklist_id: "card-1-checklist-1".into(),
                    text: "item".into(),
                },
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_checklist_is_reused_case_insensitively() -> Result<()> {
        let dir = tempdir()?;
        let outbox = OutboxNotifier::new(dir.path().join("outbox.jsonl"));

        let first = outbox.ensure_checklist("card-1", "Time Entries").await?;
        let second = outbox.ensure_checklist("card-1", "time entries").await?;
        let other_card = outbox.ensure_checklist("card-2", "Time Entries").await?;

        assert_eq!(first, second);
        assert_ne!(first, other_card);
        assert_eq!(outbox.events().await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_outbox_skips_broken_lines() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let path = dir.path().join("outbox.jsonl");
        let mut file = std::fs::File::create(&path)?;
        // A write cut off half way.
        file.write_all(b"{\"type\":\"comment\",\"card_")?;
        drop(file);

        let outbox = OutboxNotifier::new(path);
        outbox.post_comment("card-1", "after crash").await?;

        assert_eq!(
            outbox.events().await?,
            vec![OutboxEvent::Comment {
                card_id: "card-1".into(),
                text: "after crash".into(),
            }]
        );
        Ok(())
    }
}
