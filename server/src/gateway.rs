use std::sync::Arc;

use system::{
    AnswerConfirmedEvent, AskQuestion, ConnectionId, NewQuestionEvent, PollCode, PollCommand,
    PollCoordinator, PollError, PollEvent, PollResult, PostChatMessage, QuestionEndedEvent,
    QuestionTimeout, RemoveStudent, ResultsUpdateEvent, RosterEvent, StudentId, StudentJoin,
    StudentJoinedEvent, SubmitAnswer, TeacherJoin,
};

use crate::connection_tx_storage::ConnectionTx;
use crate::server::ServerHandle;

/// Self-asserted identity of a bound connection. Nothing here is verified.
#[derive(Debug, Clone, PartialEq)]
pub enum Participant {
    Teacher {
        teacher_id: String,
    },
    Student {
        student_id: StudentId,
        student_name: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub poll_code: PollCode,
    pub participant: Participant,
}

/// Per-connection state, owned by the connection and handed to every call.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionContext {
    pub connection_id: ConnectionId,
    pub binding: Option<Binding>,
}

impl ConnectionContext {
    pub fn new(connection_id: ConnectionId) -> Self {
        Self {
            connection_id,
            binding: None,
        }
    }

    /// The bound poll code when this connection is the teacher of `poll_code`.
    fn teacher_binding(&self, poll_code: &str) -> Option<PollCode> {
        let poll_code = PollCode::parse(poll_code).ok()?;
        match &self.binding {
            Some(Binding {
                poll_code: bound,
                participant: Participant::Teacher { .. },
            }) if *bound == poll_code => Some(poll_code),
            _ => None,
        }
    }
}

/// Turns inbound client events into state-machine operations and their
/// results into broadcasts and private replies.
pub struct Gateway {
    coordinator: Arc<PollCoordinator>,
    server: ServerHandle,
}

impl Gateway {
    pub fn new(coordinator: Arc<PollCoordinator>, server: ServerHandle) -> Self {
        Self {
            coordinator,
            server,
        }
    }

    pub fn connect(&self, connection_id: ConnectionId, tx: ConnectionTx) {
        self.server.connect(connection_id, tx);
    }

    /// Replies privately with an `error` event.
    pub fn reject(&self, context: &ConnectionContext, err: &PollError) {
        log::warn!("Rejected command of {}: {}", context.connection_id, err);
        self.server
            .send_to(context.connection_id, PollEvent::error(err.to_string()));
    }

    pub async fn handle_command(&self, context: &mut ConnectionContext, command: PollCommand) {
        log::debug!("Ingress from {}: {:?}", context.connection_id, command);
        let result = match command {
            PollCommand::TeacherJoin(c) => self.teacher_join(context, c).await,
            PollCommand::StudentJoin(c) => self.student_join(context, c).await,
            PollCommand::AskQuestion(c) => self.ask_question(context, c).await,
            PollCommand::SubmitAnswer(c) => self.submit_answer(context, c).await,
            PollCommand::QuestionTimeout(c) => self.question_timeout(c).await,
            PollCommand::ChatMessage(c) => self.chat_message(c).await,
            PollCommand::RemoveStudent(c) => self.remove_student(context, c).await,
        };
        if let Err(err) = result {
            self.reject(context, &err);
        }
    }

    /// Cleans up after a lost connection. Only student bindings touch the poll.
    pub async fn handle_disconnect(&self, context: &ConnectionContext) {
        if let Some(Binding {
            poll_code,
            participant: Participant::Student { student_id, .. },
        }) = &context.binding
        {
            match self.coordinator.leave(poll_code, &context.connection_id).await {
                Ok(Some(left)) => {
                    self.server.broadcast(
                        poll_code.clone(),
                        PollEvent::StudentLeft(RosterEvent {
                            student_id: student_id.clone(),
                            students: left.students.clone(),
                        }),
                    );
                    log::info!("Student {} left poll {}", student_id, poll_code);
                }
                Ok(None) => {}
                Err(err) => log::error!(
                    "Failed to clean up connection {} in poll {}: {}",
                    context.connection_id,
                    poll_code,
                    err
                ),
            }
        }
        self.server.disconnect(context.connection_id);
    }

    async fn teacher_join(&self, context: &mut ConnectionContext, c: TeacherJoin) -> PollResult<()> {
        let poll_code = PollCode::parse(&c.poll_code)?;
        let snapshot = self.coordinator.teacher_join(&poll_code).await?;
        self.server
            .subscribe(context.connection_id, poll_code.clone());
        if let Some(poll) = snapshot.as_ref() {
            self.server
                .send_to(context.connection_id, PollEvent::PollData(poll.clone()));
        }
        log::info!("Teacher {} joined poll {}", c.teacher_id, poll_code);
        context.binding = Some(Binding {
            poll_code,
            participant: Participant::Teacher {
                teacher_id: c.teacher_id,
            },
        });
        Ok(())
    }

    async fn student_join(&self, context: &mut ConnectionContext, c: StudentJoin) -> PollResult<()> {
        let poll_code = PollCode::parse(&c.poll_code)?;
        let joined = self
            .coordinator
            .student_join(&poll_code, &c.student_name, context.connection_id)
            .await?;
        self.server
            .subscribe(context.connection_id, poll_code.clone());
        self.server
            .send_to(context.connection_id, PollEvent::PollData(joined.poll.clone()));
        self.server.broadcast(
            poll_code.clone(),
            PollEvent::StudentJoined(StudentJoinedEvent {
                student_id: joined.student.student_id.clone(),
                student_name: joined.student.student_name.clone(),
                students: joined.poll.active_students.clone(),
            }),
        );
        log::info!("Student {} joined poll {}", c.student_name, poll_code);
        context.binding = Some(Binding {
            poll_code,
            participant: Participant::Student {
                student_id: joined.student.student_id.clone(),
                student_name: c.student_name,
            },
        });
        Ok(())
    }

    async fn ask_question(&self, context: &ConnectionContext, c: AskQuestion) -> PollResult<()> {
        let poll_code = match context.teacher_binding(&c.poll_code) {
            Some(poll_code) => poll_code,
            None => {
                return Err(PollError::validation(
                    "Only the teacher of this poll can ask questions",
                ))
            }
        };
        c.validate()?;
        let asked = self
            .coordinator
            .ask_question(&poll_code, c.into_new_question())
            .await?;
        self.server.broadcast(
            poll_code.clone(),
            PollEvent::NewQuestion(NewQuestionEvent {
                question_index: asked.question_index,
                question: asked.question.clone(),
            }),
        );
        log::info!("Question {} asked in poll {}", asked.question_index, poll_code);
        Ok(())
    }

    async fn submit_answer(&self, context: &ConnectionContext, c: SubmitAnswer) -> PollResult<()> {
        let poll_code = PollCode::parse(&c.poll_code)?;
        let accepted = self
            .coordinator
            .submit_answer(
                &poll_code,
                c.question_index,
                &c.selected_option,
                &c.student_id,
                &c.student_name,
            )
            .await?;
        self.server.broadcast(
            poll_code.clone(),
            PollEvent::ResultsUpdate(ResultsUpdateEvent {
                question_index: accepted.question_index,
                results: accepted.results.clone(),
                total_answers: accepted.total_answers,
                total_students: accepted.total_students,
            }),
        );
        self.server.send_to(
            context.connection_id,
            PollEvent::AnswerConfirmed(AnswerConfirmedEvent {
                question_index: accepted.question_index,
                selected_option: accepted.selected_option.clone(),
            }),
        );
        log::info!(
            "Answer submitted for question {} in poll {}",
            c.question_index,
            poll_code
        );
        Ok(())
    }

    /// Unknown polls, malformed codes included, are ignored.
    async fn question_timeout(&self, c: QuestionTimeout) -> PollResult<()> {
        let poll_code = match PollCode::parse(&c.poll_code) {
            Ok(poll_code) => poll_code,
            Err(_) => return Ok(()),
        };
        if let Some(ended) = self
            .coordinator
            .expire_question(&poll_code, c.question_index)
            .await?
        {
            self.server.broadcast(
                poll_code,
                PollEvent::QuestionEnded(QuestionEndedEvent {
                    question_index: ended.question_index,
                    results: ended.results.clone(),
                }),
            );
        }
        Ok(())
    }

    async fn chat_message(&self, c: PostChatMessage) -> PollResult<()> {
        c.validate()?;
        let poll_code = PollCode::parse(&c.poll_code)?;
        let message = self
            .coordinator
            .post_chat_message(&poll_code, c.into_new_chat_message())
            .await?;
        self.server
            .broadcast(poll_code, PollEvent::ChatMessage((*message).clone()));
        Ok(())
    }

    async fn remove_student(&self, context: &ConnectionContext, c: RemoveStudent) -> PollResult<()> {
        let poll_code = match context.teacher_binding(&c.poll_code) {
            Some(poll_code) => poll_code,
            None => {
                return Err(PollError::validation(
                    "Only the teacher of this poll can remove students",
                ))
            }
        };
        if let Some(removed) = self
            .coordinator
            .remove_student(&poll_code, &c.student_id)
            .await?
        {
            self.server
                .send_to(removed.student.socket_id, PollEvent::StudentKicked);
            self.server.broadcast(
                poll_code.clone(),
                PollEvent::StudentRemoved(RosterEvent {
                    student_id: c.student_id.clone(),
                    students: removed.students.clone(),
                }),
            );
            log::info!("Student {} removed from poll {}", c.student_id, poll_code);
        }
        Ok(())
    }
}
