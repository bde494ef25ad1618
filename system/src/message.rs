//! Realtime wire protocol.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`.
//! Event names and payload field names are kept verbatim for existing clients.
//! Inbound `pollCode` fields stay raw strings until the gateway parses them
//! into a [`PollCode`](crate::PollCode).

use serde::{Deserialize, Serialize};

use crate::chat::{ChatMessage, NewChatMessage};
use crate::error::{PollError, PollResult};
use crate::poll::{ActiveStudent, NewQuestion, Poll, Question};
use crate::results::QuestionResults;
use crate::types::{Role, StudentId};

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 6;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherJoin {
    pub poll_code: String,
    pub teacher_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentJoin {
    pub poll_code: String,
    pub student_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskQuestion {
    pub poll_code: String,
    pub question: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub time_limit: Option<u32>,
}

impl AskQuestion {
    pub fn validate(&self) -> PollResult<()> {
        if self.question.trim().is_empty() {
            return Err(PollError::validation("Question text is required"));
        }
        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&self.options.len()) {
            return Err(PollError::validation(format!(
                "A question needs between {} and {} options",
                MIN_OPTIONS, MAX_OPTIONS
            )));
        }
        if self.options.iter().any(|option| option.trim().is_empty()) {
            return Err(PollError::validation("Options must not be empty"));
        }
        Ok(())
    }

    pub fn into_new_question(self) -> NewQuestion {
        NewQuestion {
            question_text: self.question,
            options: self.options,
            correct_answer: self.correct_answer.filter(|answer| !answer.is_empty()),
            time_limit: self.time_limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswer {
    pub poll_code: String,
    pub question_index: usize,
    pub selected_option: String,
    pub student_name: String,
    pub student_id: StudentId,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionTimeout {
    pub poll_code: String,
    pub question_index: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostChatMessage {
    pub poll_code: String,
    pub message: String,
    pub sender_name: String,
    pub sender_id: String,
    pub sender_role: Role,
}

impl PostChatMessage {
    pub fn validate(&self) -> PollResult<()> {
        if self.message.trim().is_empty() {
            return Err(PollError::validation("Message must not be empty"));
        }
        Ok(())
    }

    pub fn into_new_chat_message(self) -> NewChatMessage {
        NewChatMessage {
            sender_name: self.sender_name,
            sender_id: self.sender_id,
            sender_role: self.sender_role,
            message: self.message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveStudent {
    pub poll_code: String,
    pub student_id: StudentId,
}

/// Client to server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum PollCommand {
    #[serde(rename = "teacher:join")]
    TeacherJoin(TeacherJoin),
    #[serde(rename = "student:join")]
    StudentJoin(StudentJoin),
    #[serde(rename = "question:ask")]
    AskQuestion(AskQuestion),
    #[serde(rename = "answer:submit")]
    SubmitAnswer(SubmitAnswer),
    #[serde(rename = "question:timeout")]
    QuestionTimeout(QuestionTimeout),
    #[serde(rename = "chat:message")]
    ChatMessage(PostChatMessage),
    #[serde(rename = "student:remove")]
    RemoveStudent(RemoveStudent),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentJoinedEvent {
    pub student_id: StudentId,
    pub student_name: String,
    pub students: Vec<ActiveStudent>,
}

/// Roster after a student was removed or left.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEvent {
    pub student_id: StudentId,
    pub students: Vec<ActiveStudent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestionEvent {
    pub question_index: usize,
    pub question: Question,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsUpdateEvent {
    pub question_index: usize,
    pub results: QuestionResults,
    pub total_answers: usize,
    pub total_students: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerConfirmedEvent {
    pub question_index: usize,
    pub selected_option: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionEndedEvent {
    pub question_index: usize,
    pub results: QuestionResults,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEvent {
    pub message: String,
}

/// Server to client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum PollEvent {
    #[serde(rename = "poll:data")]
    PollData(Poll),
    #[serde(rename = "student:joined")]
    StudentJoined(StudentJoinedEvent),
    #[serde(rename = "student:removed")]
    StudentRemoved(RosterEvent),
    #[serde(rename = "student:left")]
    StudentLeft(RosterEvent),
    #[serde(rename = "student:kicked")]
    StudentKicked,
    #[serde(rename = "question:new")]
    NewQuestion(NewQuestionEvent),
    #[serde(rename = "results:update")]
    ResultsUpdate(ResultsUpdateEvent),
    #[serde(rename = "answer:confirmed")]
    AnswerConfirmed(AnswerConfirmedEvent),
    #[serde(rename = "question:ended")]
    QuestionEnded(QuestionEndedEvent),
    #[serde(rename = "chat:message")]
    ChatMessage(ChatMessage),
    #[serde(rename = "error")]
    Error(ErrorEvent),
}

impl PollEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorEvent {
            message: message.into(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::PollData(_) => "poll:data",
            Self::StudentJoined(_) => "student:joined",
            Self::StudentRemoved(_) => "student:removed",
            Self::StudentLeft(_) => "student:left",
            Self::StudentKicked => "student:kicked",
            Self::NewQuestion(_) => "question:new",
            Self::ResultsUpdate(_) => "results:update",
            Self::AnswerConfirmed(_) => "answer:confirmed",
            Self::QuestionEnded(_) => "question:ended",
            Self::ChatMessage(_) => "chat:message",
            Self::Error(_) => "error",
        }
    }
}
