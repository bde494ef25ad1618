use serde::Serialize;
use std::sync::Arc;

use crate::chat::ChatMessage;
use crate::error::{PollError, PollResult};
use crate::poll::{Answer, Poll};
use crate::results::{aggregate, QuestionResults};
use crate::store::PollStore;
use crate::types::PollCode;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionReport {
    pub question_text: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    pub answers: Vec<Answer>,
    pub results: QuestionResults,
}

/// Read-only accessors used for first render and reconnect catch-up.
#[derive(Clone)]
pub struct PollQueries {
    store: Arc<dyn PollStore>,
}

impl PollQueries {
    pub fn new(store: Arc<dyn PollStore>) -> Self {
        Self { store }
    }

    pub async fn get_poll(&self, poll_code: &PollCode) -> PollResult<Poll> {
        self.store
            .find_poll(poll_code)
            .await?
            .ok_or_else(|| PollError::PollNotFound(poll_code.clone()))
    }

    pub async fn polls_by_teacher(&self, teacher_id: &str) -> PollResult<Vec<Poll>> {
        Ok(self.store.list_polls_by_teacher(teacher_id).await?)
    }

    pub async fn poll_results(&self, poll_code: &PollCode) -> PollResult<Vec<QuestionReport>> {
        let poll = self.get_poll(poll_code).await?;
        Ok(poll
            .questions
            .into_iter()
            .map(|question| QuestionReport {
                results: aggregate(&question),
                question_text: question.question_text,
                options: question.options,
                correct_answer: question.correct_answer,
                answers: question.answers,
            })
            .collect())
    }

    pub async fn chat_history(&self, poll_code: &PollCode) -> PollResult<Vec<ChatMessage>> {
        self.get_poll(poll_code).await?;
        Ok(self.store.list_chat_messages(poll_code).await?)
    }
}
