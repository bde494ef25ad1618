use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::chat::ChatMessage;
use crate::error::StoreError;
use crate::poll::Poll;
use crate::store::{sort_newest_first, sort_oldest_first, PollStore, StoreResult};
use crate::types::PollCode;

const POLL_EXTENSION: &str = "json";

/// Stores each poll as a JSON document and each chat log as JSON lines:
///
/// ```text
/// base_dir/
/// ├── polls/
/// │   └── AB12CD.json
/// └── chat/
///     └── AB12CD.jsonl
/// ```
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    pub async fn open(base_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(base_dir.join("polls")).await?;
        fs::create_dir_all(base_dir.join("chat")).await?;
        log::info!("Using poll store at {}", base_dir.display());
        Ok(Self { base_dir })
    }

    fn poll_path(&self, poll_code: &PollCode) -> PathBuf {
        self.base_dir
            .join("polls")
            .join(format!("{}.{}", poll_code, POLL_EXTENSION))
    }

    fn chat_path(&self, poll_code: &PollCode) -> PathBuf {
        self.base_dir
            .join("chat")
            .join(format!("{}.jsonl", poll_code))
    }
}

#[async_trait]
impl PollStore for FileStore {
    async fn insert_poll(&self, poll: &Poll) -> StoreResult<()> {
        let content = serde_json::to_vec_pretty(poll)?;
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.poll_path(&poll.poll_code))
            .await;
        let mut file = match file {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists(poll.poll_code.clone()))
            }
            Err(err) => return Err(err.into()),
        };
        file.write_all(&content).await?;
        file.flush().await?;
        Ok(())
    }

    async fn find_poll(&self, poll_code: &PollCode) -> StoreResult<Option<Poll>> {
        match fs::read(self.poll_path(poll_code)).await {
            Ok(content) => Ok(Some(serde_json::from_slice(&content)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save_poll(&self, poll: &Poll) -> StoreResult<()> {
        let path = self.poll_path(&poll.poll_code);
        let tmp_path = path.with_extension(format!("{}.tmp", POLL_EXTENSION));
        fs::write(&tmp_path, serde_json::to_vec_pretty(poll)?).await?;
        fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    async fn list_polls_by_teacher(&self, teacher_id: &str) -> StoreResult<Vec<Poll>> {
        let mut result = Vec::new();
        let mut entries = fs::read_dir(self.base_dir.join("polls")).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(POLL_EXTENSION) {
                continue;
            }
            let content = fs::read(&path).await?;
            match serde_json::from_slice::<Poll>(&content) {
                Ok(poll) if poll.teacher_id == teacher_id => result.push(poll),
                Ok(_) => {}
                Err(err) => log::warn!("Skipping unreadable poll file {}: {}", path.display(), err),
            }
        }
        sort_newest_first(&mut result);
        Ok(result)
    }

    async fn append_chat_message(&self, message: &ChatMessage) -> StoreResult<()> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.chat_path(&message.poll_code))
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn list_chat_messages(&self, poll_code: &PollCode) -> StoreResult<Vec<ChatMessage>> {
        let content = match fs::read_to_string(self.chat_path(poll_code)).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut messages = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str::<ChatMessage>)
            .collect::<Result<Vec<_>, _>>()?;
        sort_oldest_first(&mut messages);
        Ok(messages)
    }
}
