use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PollError, PollResult};
use crate::types::{ConnectionId, PollCode, StudentId};

pub const DEFAULT_TIME_LIMIT_SECS: u32 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub student_name: String,
    pub student_id: StudentId,
    pub selected_option: String,
    pub answered_at: DateTime<Utc>,
}

impl Answer {
    pub fn new(student_id: StudentId, student_name: String, selected_option: String) -> Self {
        Self {
            student_name,
            student_id,
            selected_option,
            answered_at: Utc::now(),
        }
    }
}

/// Teacher input for a new question.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: Option<String>,
    /// Seconds; `None` and `Some(0)` both fall back to the default.
    pub time_limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question_text: String,
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    pub time_limit: u32,
    pub answers: Vec<Answer>,
    pub asked_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Question {
    pub fn new(new_question: NewQuestion) -> Self {
        Self {
            question_text: new_question.question_text,
            options: new_question.options,
            correct_answer: new_question.correct_answer,
            time_limit: new_question
                .time_limit
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_TIME_LIMIT_SECS),
            answers: Vec::new(),
            asked_at: Utc::now(),
            is_active: true,
        }
    }

    pub fn answer_of(&self, student_id: &str) -> Option<&Answer> {
        self.answers.iter().find(|a| a.student_id == student_id)
    }
}

/// Roster entry of a connected student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveStudent {
    pub student_id: StudentId,
    pub student_name: String,
    pub socket_id: ConnectionId,
    pub joined_at: DateTime<Utc>,
}

/// One teacher-owned poll session: the unit of persistence and of locking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub poll_code: PollCode,
    pub teacher_id: String,
    pub questions: Vec<Question>,
    pub active_students: Vec<ActiveStudent>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Poll {
    pub fn new(poll_code: PollCode, teacher_id: String) -> Self {
        Self {
            poll_code,
            teacher_id,
            questions: Vec::new(),
            active_students: Vec::new(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn question(&self, question_index: usize) -> PollResult<&Question> {
        self.questions
            .get(question_index)
            .ok_or_else(|| self.question_not_found(question_index))
    }

    /// Adds a roster entry whose identity is the joining connection.
    pub fn add_student(&mut self, student_name: String, connection_id: ConnectionId) -> ActiveStudent {
        let student = ActiveStudent {
            student_id: connection_id.to_string(),
            student_name,
            socket_id: connection_id,
            joined_at: Utc::now(),
        };
        self.active_students.push(student.clone());
        student
    }

    /// Deactivates every earlier question and appends `new_question` as the
    /// only active one. The superseded question gets no ended notice.
    pub fn ask(&mut self, new_question: NewQuestion) -> usize {
        for question in &mut self.questions {
            question.is_active = false;
        }
        self.questions.push(Question::new(new_question));
        self.questions.len() - 1
    }

    /// Records the first answer of a student. Inactive questions still accept
    /// answers as long as the index exists.
    pub fn record_answer(&mut self, question_index: usize, answer: Answer) -> PollResult<&Question> {
        let not_found = self.question_not_found(question_index);
        let question = self
            .questions
            .get_mut(question_index)
            .ok_or(not_found)?;
        if question.answer_of(&answer.student_id).is_some() {
            return Err(PollError::DuplicateAnswer);
        }
        question.answers.push(answer);
        Ok(&*question)
    }

    /// Idempotent; returns `None` for an unknown index.
    pub fn end_question(&mut self, question_index: usize) -> Option<&Question> {
        let question = self.questions.get_mut(question_index)?;
        question.is_active = false;
        Some(&*question)
    }

    pub fn remove_student(&mut self, student_id: &str) -> Option<ActiveStudent> {
        let position = self
            .active_students
            .iter()
            .position(|s| s.student_id == student_id)?;
        Some(self.active_students.remove(position))
    }

    /// Drops every roster entry represented by `connection_id`.
    pub fn remove_connection(&mut self, connection_id: &ConnectionId) -> Vec<ActiveStudent> {
        let (left, stayed): (Vec<_>, Vec<_>) = self
            .active_students
            .drain(..)
            .partition(|s| s.socket_id == *connection_id);
        self.active_students = stayed;
        left
    }

    fn question_not_found(&self, question_index: usize) -> PollError {
        PollError::QuestionNotFound {
            poll_code: self.poll_code.clone(),
            question_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(raw: &str) -> PollCode {
        PollCode::parse(raw).expect("valid poll code")
    }

    fn new_question(text: &str) -> NewQuestion {
        NewQuestion {
            question_text: text.into(),
            options: vec!["Red".into(), "Blue".into()],
            correct_answer: None,
            time_limit: None,
        }
    }

    #[test]
    fn it_keeps_only_the_newest_question_active() {
        let mut poll = Poll::new(code("ABC123"), "teacher".into());
        assert_eq!(poll.ask(new_question("first")), 0);
        assert_eq!(poll.ask(new_question("second")), 1);
        assert_eq!(poll.ask(new_question("third")), 2);

        let active = poll.questions.iter().map(|q| q.is_active).collect::<Vec<_>>();
        assert_eq!(active, vec![false, false, true]);
    }

    #[test]
    fn it_defaults_time_limit() {
        let mut question = new_question("q");
        assert_eq!(Question::new(question.clone()).time_limit, 60);
        question.time_limit = Some(0);
        assert_eq!(Question::new(question.clone()).time_limit, 60);
        question.time_limit = Some(15);
        assert_eq!(Question::new(question).time_limit, 15);
    }

    #[test]
    fn it_rejects_second_answer_of_same_student() {
        let mut poll = Poll::new(code("ABC123"), "teacher".into());
        poll.ask(new_question("q"));
        poll.record_answer(0, Answer::new("s1".into(), "Ann".into(), "Blue".into()))
            .expect("");
        let err = poll
            .record_answer(0, Answer::new("s1".into(), "Ann".into(), "Red".into()))
            .unwrap_err();
        assert!(matches!(err, PollError::DuplicateAnswer));
        assert_eq!(poll.questions[0].answers.len(), 1);
        assert_eq!(poll.questions[0].answers[0].selected_option, "Blue");
    }

    #[test]
    fn it_accepts_late_answers_to_superseded_questions() {
        let mut poll = Poll::new(code("ABC123"), "teacher".into());
        poll.ask(new_question("first"));
        poll.ask(new_question("second"));
        assert!(!poll.questions[0].is_active);
        poll.record_answer(0, Answer::new("s1".into(), "Ann".into(), "Red".into()))
            .expect("late answer is accepted");
    }

    #[test]
    fn it_reports_missing_question_index() {
        let mut poll = Poll::new(code("ABC123"), "teacher".into());
        let err = poll
            .record_answer(3, Answer::new("s1".into(), "Ann".into(), "Red".into()))
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(poll.end_question(3).is_none());
    }

    #[test]
    fn it_removes_students_by_connection() {
        let mut poll = Poll::new(code("ABC123"), "teacher".into());
        let a = uuid::Uuid::new_v4();
        let b = uuid::Uuid::new_v4();
        poll.add_student("Ann".into(), a);
        poll.add_student("Ben".into(), b);
        poll.add_student("Ann again".into(), a);

        let left = poll.remove_connection(&a);
        assert_eq!(left.len(), 2);
        assert_eq!(poll.active_students.len(), 1);
        assert_eq!(poll.active_students[0].student_name, "Ben");
        assert!(poll.remove_connection(&a).is_empty());
    }

    #[test]
    fn it_derives_student_id_from_connection() {
        let mut poll = Poll::new(code("ABC123"), "teacher".into());
        let connection_id = uuid::Uuid::new_v4();
        let student = poll.add_student("Ann".into(), connection_id);
        assert_eq!(student.student_id, connection_id.to_string());
        assert_eq!(poll.remove_student(&student.student_id), Some(student));
        assert_eq!(poll.remove_student("nobody"), None);
    }

    #[test]
    fn it_uses_camel_case_field_names() {
        let mut poll = Poll::new(code("ABC123"), "teacher-1".into());
        poll.ask(new_question("q"));
        let value = serde_json::to_value(&poll).expect("");
        assert_eq!(value["pollCode"], "ABC123");
        assert_eq!(value["teacherId"], "teacher-1");
        assert_eq!(value["isActive"], true);
        assert_eq!(value["questions"][0]["questionText"], "q");
        assert_eq!(value["questions"][0]["timeLimit"], 60);
        assert!(value["activeStudents"].is_array());
    }
}
