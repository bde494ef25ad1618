use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::chat::{ChatMessage, NewChatMessage};
use crate::error::{PollError, PollResult, StoreError};
use crate::poll::{ActiveStudent, Answer, NewQuestion, Poll, Question};
use crate::results::{aggregate, QuestionResults};
use crate::store::PollStore;
use crate::types::{ConnectionId, PollCode, StudentId, POLL_CODE_LENGTH};

const POLL_CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const MAX_POLL_CODE_ATTEMPTS: usize = 5;

fn generate_poll_code() -> PollResult<PollCode> {
    let mut rng = rand::thread_rng();
    let code = (0..POLL_CODE_LENGTH)
        .map(|_| POLL_CODE_ALPHABET[rng.gen_range(0..POLL_CODE_ALPHABET.len())] as char)
        .collect::<String>();
    PollCode::parse(&code)
}

/// Result of a mutation that has been persisted.
///
/// The poll stays locked while this value is alive, so whatever the caller
/// broadcasts before dropping it is ordered exactly like the commits.
#[derive(Debug)]
pub struct Committed<T> {
    value: T,
    _guard: PollGuard,
}

impl<T> Committed<T> {
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for Committed<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentJoined {
    pub student: ActiveStudent,
    pub poll: Poll,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionAsked {
    pub question_index: usize,
    pub question: Question,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerAccepted {
    pub question_index: usize,
    pub selected_option: String,
    pub results: QuestionResults,
    pub total_answers: usize,
    pub total_students: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionEnded {
    pub question_index: usize,
    pub results: QuestionResults,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentRemoved {
    pub student: ActiveStudent,
    pub students: Vec<ActiveStudent>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentsLeft {
    pub departed: Vec<ActiveStudent>,
    pub students: Vec<ActiveStudent>,
}

#[derive(Debug, Default)]
struct LockEntry {
    lock: Arc<AsyncMutex<()>>,
    users: usize,
}

type LockTable = Arc<Mutex<HashMap<PollCode, LockEntry>>>;

/// One async mutex per poll code, kept only while someone holds or awaits it.
#[derive(Default)]
struct PollLocks {
    table: LockTable,
}

impl PollLocks {
    async fn acquire(&self, poll_code: &PollCode) -> PollGuard {
        let lock = {
            let mut table = self.table.lock();
            let entry = table.entry(poll_code.clone()).or_default();
            entry.users += 1;
            entry.lock.clone()
        };
        // Exists before the await so a cancelled waiter still checks out.
        let mut guard = PollGuard {
            table: self.table.clone(),
            poll_code: poll_code.clone(),
            held: None,
        };
        guard.held = Some(lock.lock_owned().await);
        guard
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table.lock().len()
    }
}

#[derive(Debug)]
struct PollGuard {
    table: LockTable,
    poll_code: PollCode,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for PollGuard {
    fn drop(&mut self) {
        let mut table = self.table.lock();
        self.held.take();
        if let Some(entry) = table.get_mut(&self.poll_code) {
            entry.users -= 1;
            if entry.users == 0 {
                table.remove(&self.poll_code);
            }
        }
    }
}

/// Authoritative state machine of every poll.
///
/// Each mutation locks its poll code, loads the whole document, applies the
/// transition, and writes the document back. If the write fails the mutated
/// copy is dropped and nothing is reported as committed.
pub struct PollCoordinator {
    store: Arc<dyn PollStore>,
    locks: PollLocks,
}

impl PollCoordinator {
    pub fn new(store: Arc<dyn PollStore>) -> Self {
        Self {
            store,
            locks: PollLocks::default(),
        }
    }

    pub fn store(&self) -> &Arc<dyn PollStore> {
        &self.store
    }

    pub async fn create_poll(&self, teacher_id: &str) -> PollResult<Poll> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let poll = Poll::new(generate_poll_code()?, teacher_id.to_owned());
            match self.store.insert_poll(&poll).await {
                Ok(()) => {
                    log::info!("Teacher {} created poll {}", teacher_id, poll.poll_code);
                    return Ok(poll);
                }
                Err(StoreError::AlreadyExists(code)) if attempts < MAX_POLL_CODE_ATTEMPTS => {
                    log::warn!("Poll code {} is taken, generating another one", code);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Snapshot for a teacher connection; `None` when the poll does not exist.
    pub async fn teacher_join(&self, poll_code: &PollCode) -> PollResult<Committed<Option<Poll>>> {
        let guard = self.locks.acquire(poll_code).await;
        let poll = self.store.find_poll(poll_code).await?;
        Ok(Committed {
            value: poll,
            _guard: guard,
        })
    }

    pub async fn student_join(
        &self,
        poll_code: &PollCode,
        student_name: &str,
        connection_id: ConnectionId,
    ) -> PollResult<Committed<StudentJoined>> {
        self.mutate(poll_code, |poll| {
            let student = poll.add_student(student_name.to_owned(), connection_id);
            Ok(StudentJoined {
                student,
                poll: poll.clone(),
            })
        })
        .await
    }

    pub async fn ask_question(
        &self,
        poll_code: &PollCode,
        new_question: NewQuestion,
    ) -> PollResult<Committed<QuestionAsked>> {
        self.mutate(poll_code, |poll| {
            let question_index = poll.ask(new_question);
            Ok(QuestionAsked {
                question_index,
                question: poll.questions[question_index].clone(),
            })
        })
        .await
    }

    pub async fn submit_answer(
        &self,
        poll_code: &PollCode,
        question_index: usize,
        selected_option: &str,
        student_id: &str,
        student_name: &str,
    ) -> PollResult<Committed<AnswerAccepted>> {
        self.mutate(poll_code, |poll| {
            let answer = Answer::new(
                student_id.to_owned(),
                student_name.to_owned(),
                selected_option.to_owned(),
            );
            let question = poll.record_answer(question_index, answer)?;
            let results = aggregate(question);
            let total_answers = question.answers.len();
            Ok(AnswerAccepted {
                question_index,
                selected_option: selected_option.to_owned(),
                results,
                total_answers,
                total_students: poll.active_students.len(),
            })
        })
        .await
    }

    /// Idempotent. Results are recomputed on every call, even when the
    /// question had already ended.
    pub async fn expire_question(
        &self,
        poll_code: &PollCode,
        question_index: usize,
    ) -> PollResult<Option<Committed<QuestionEnded>>> {
        self.mutate_if(poll_code, |poll| {
            poll.end_question(question_index).map(|question| QuestionEnded {
                question_index,
                results: aggregate(question),
            })
        })
        .await
    }

    /// Silent no-op when either the poll or the student is unknown.
    pub async fn remove_student(
        &self,
        poll_code: &PollCode,
        student_id: &StudentId,
    ) -> PollResult<Option<Committed<StudentRemoved>>> {
        self.mutate_if(poll_code, |poll| {
            poll.remove_student(student_id).map(|student| StudentRemoved {
                student,
                students: poll.active_students.clone(),
            })
        })
        .await
    }

    /// Drops the roster entries of a lost connection; `None` when it had none.
    pub async fn leave(
        &self,
        poll_code: &PollCode,
        connection_id: &ConnectionId,
    ) -> PollResult<Option<Committed<StudentsLeft>>> {
        self.mutate_if(poll_code, |poll| {
            let departed = poll.remove_connection(connection_id);
            if departed.is_empty() {
                None
            } else {
                Some(StudentsLeft {
                    departed,
                    students: poll.active_students.clone(),
                })
            }
        })
        .await
    }

    pub async fn post_chat_message(
        &self,
        poll_code: &PollCode,
        new_message: NewChatMessage,
    ) -> PollResult<Committed<ChatMessage>> {
        let guard = self.locks.acquire(poll_code).await;
        if self.store.find_poll(poll_code).await?.is_none() {
            return Err(PollError::PollNotFound(poll_code.clone()));
        }
        let message = ChatMessage::new(poll_code.clone(), new_message);
        self.store.append_chat_message(&message).await?;
        Ok(Committed {
            value: message,
            _guard: guard,
        })
    }

    async fn mutate<T, F>(&self, poll_code: &PollCode, transition: F) -> PollResult<Committed<T>>
    where
        F: FnOnce(&mut Poll) -> PollResult<T>,
    {
        let guard = self.locks.acquire(poll_code).await;
        let mut poll = self
            .store
            .find_poll(poll_code)
            .await?
            .ok_or_else(|| PollError::PollNotFound(poll_code.clone()))?;
        let value = transition(&mut poll)?;
        self.save(&poll).await?;
        Ok(Committed {
            value,
            _guard: guard,
        })
    }

    /// Like `mutate`, but a missing poll or a transition yielding `None`
    /// leaves the store untouched and reports `None`.
    async fn mutate_if<T, F>(
        &self,
        poll_code: &PollCode,
        transition: F,
    ) -> PollResult<Option<Committed<T>>>
    where
        F: FnOnce(&mut Poll) -> Option<T>,
    {
        let guard = self.locks.acquire(poll_code).await;
        let mut poll = match self.store.find_poll(poll_code).await? {
            Some(poll) => poll,
            None => return Ok(None),
        };
        match transition(&mut poll) {
            Some(value) => {
                self.save(&poll).await?;
                Ok(Some(Committed {
                    value,
                    _guard: guard,
                }))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, poll: &Poll) -> PollResult<()> {
        self.store.save_poll(poll).await.map_err(|err| {
            log::error!("Failed to save poll {}: {}", poll.poll_code, err);
            PollError::from(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::time::Duration;
    use uuid::Uuid;

    fn coordinator() -> PollCoordinator {
        PollCoordinator::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn it_forgets_locks_of_unknown_polls() {
        let coordinator = coordinator();
        for i in 0..100 {
            let code = PollCode::parse(&format!("ZZ{:04}", i)).expect("");
            let err = coordinator
                .student_join(&code, "Ann", Uuid::new_v4())
                .await
                .expect_err("unknown poll");
            assert!(err.is_not_found());
        }
        assert_eq!(coordinator.locks.len(), 0);
    }

    #[tokio::test]
    async fn it_keeps_a_lock_only_while_the_commit_is_alive() {
        let coordinator = coordinator();
        let poll = coordinator.create_poll("teacher").await.expect("");
        let joined = coordinator
            .student_join(&poll.poll_code, "Ann", Uuid::new_v4())
            .await
            .expect("");
        assert_eq!(coordinator.locks.len(), 1);
        drop(joined);
        assert_eq!(coordinator.locks.len(), 0);
    }

    #[tokio::test]
    async fn it_checks_out_cancelled_waiters() {
        let coordinator = coordinator();
        let code = PollCode::parse("ABC123").expect("");
        let held = coordinator.locks.acquire(&code).await;
        let waiter =
            tokio::time::timeout(Duration::from_millis(10), coordinator.locks.acquire(&code)).await;
        assert!(waiter.is_err());
        assert_eq!(coordinator.locks.len(), 1);
        drop(held);
        assert_eq!(coordinator.locks.len(), 0);
    }
}
