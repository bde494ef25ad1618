use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::chat::ChatMessage;
use crate::error::StoreError;
use crate::poll::Poll;
use crate::types::PollCode;

pub type StoreResult<T> = Result<T, StoreError>;

/// Document store holding whole polls and their chat logs.
///
/// A poll is read and written as one document; the store knows nothing about
/// questions or answers. Serializing concurrent writers is the caller's job.
#[async_trait]
pub trait PollStore: Send + Sync {
    /// Fails with [`StoreError::AlreadyExists`] when the code is taken.
    async fn insert_poll(&self, poll: &Poll) -> StoreResult<()>;

    async fn find_poll(&self, poll_code: &PollCode) -> StoreResult<Option<Poll>>;

    /// Overwrites the stored document.
    async fn save_poll(&self, poll: &Poll) -> StoreResult<()>;

    /// Newest first.
    async fn list_polls_by_teacher(&self, teacher_id: &str) -> StoreResult<Vec<Poll>>;

    async fn append_chat_message(&self, message: &ChatMessage) -> StoreResult<()>;

    /// Oldest first.
    async fn list_chat_messages(&self, poll_code: &PollCode) -> StoreResult<Vec<ChatMessage>>;
}

pub(crate) fn sort_newest_first(polls: &mut [Poll]) {
    polls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

pub(crate) fn sort_oldest_first(messages: &mut [ChatMessage]) {
    messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
}

#[derive(Default)]
pub struct MemoryStore {
    polls: RwLock<HashMap<PollCode, Poll>>,
    chat_messages: RwLock<HashMap<PollCode, Vec<ChatMessage>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn insert_poll(&self, poll: &Poll) -> StoreResult<()> {
        let mut polls = self.polls.write().await;
        if polls.contains_key(&poll.poll_code) {
            return Err(StoreError::AlreadyExists(poll.poll_code.clone()));
        }
        polls.insert(poll.poll_code.clone(), poll.clone());
        Ok(())
    }

    async fn find_poll(&self, poll_code: &PollCode) -> StoreResult<Option<Poll>> {
        Ok(self.polls.read().await.get(poll_code).cloned())
    }

    async fn save_poll(&self, poll: &Poll) -> StoreResult<()> {
        self.polls
            .write()
            .await
            .insert(poll.poll_code.clone(), poll.clone());
        Ok(())
    }

    async fn list_polls_by_teacher(&self, teacher_id: &str) -> StoreResult<Vec<Poll>> {
        let mut polls = self
            .polls
            .read()
            .await
            .values()
            .filter(|poll| poll.teacher_id == teacher_id)
            .cloned()
            .collect::<Vec<_>>();
        sort_newest_first(&mut polls);
        Ok(polls)
    }

    async fn append_chat_message(&self, message: &ChatMessage) -> StoreResult<()> {
        self.chat_messages
            .write()
            .await
            .entry(message.poll_code.clone())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn list_chat_messages(&self, poll_code: &PollCode) -> StoreResult<Vec<ChatMessage>> {
        let mut messages = self
            .chat_messages
            .read()
            .await
            .get(poll_code)
            .cloned()
            .unwrap_or_default();
        sort_oldest_first(&mut messages);
        Ok(messages)
    }
}
