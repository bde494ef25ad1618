use std::sync::Arc;
use system::{
    FileStore, NewChatMessage, NewQuestion, Poll, PollCode, PollCoordinator, PollError,
    PollQueries, PollStore, Role, StoreError,
};

fn code(raw: &str) -> PollCode {
    PollCode::parse(raw).expect("valid poll code")
}

#[tokio::test]
async fn it_persists_polls_across_reopen() {
    let dir = tempfile::tempdir().expect("");
    let code = {
        let store: Arc<dyn PollStore> = Arc::new(FileStore::open(dir.path()).await.expect(""));
        let coordinator = PollCoordinator::new(store);
        let code = coordinator.create_poll("teacher-1").await.expect("").poll_code;
        coordinator
            .student_join(&code, "Ann", uuid::Uuid::new_v4())
            .await
            .expect("");
        coordinator
            .ask_question(
                &code,
                NewQuestion {
                    question_text: "2 + 2?".into(),
                    options: vec!["3".into(), "4".into()],
                    correct_answer: Some("4".into()),
                    time_limit: Some(30),
                },
            )
            .await
            .expect("");
        coordinator
            .submit_answer(&code, 0, "4", "s1", "Ann")
            .await
            .expect("");
        coordinator
            .post_chat_message(
                &code,
                NewChatMessage {
                    sender_name: "Ms. Lee".into(),
                    sender_id: "teacher-1".into(),
                    sender_role: Role::Teacher,
                    message: "Welcome".into(),
                },
            )
            .await
            .expect("");
        code
    };

    let store: Arc<dyn PollStore> = Arc::new(FileStore::open(dir.path()).await.expect(""));
    let queries = PollQueries::new(store);
    let poll = queries.get_poll(&code).await.expect("");
    assert_eq!(poll.active_students.len(), 1);
    assert_eq!(poll.questions[0].correct_answer.as_deref(), Some("4"));
    assert_eq!(poll.questions[0].time_limit, 30);

    let reports = queries.poll_results(&code).await.expect("");
    assert_eq!(reports[0].results.percentages.get("4"), Some(100));

    let history = queries.chat_history(&code).await.expect("");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].sender_role, Role::Teacher);
}

#[tokio::test]
async fn it_refuses_to_overwrite_on_insert() {
    let dir = tempfile::tempdir().expect("");
    let store = FileStore::open(dir.path()).await.expect("");
    store
        .insert_poll(&Poll::new(code("ABCDEF"), "t1".into()))
        .await
        .expect("");
    let err = store
        .insert_poll(&Poll::new(code("ABCDEF"), "t2".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(_)));
    assert!(store.find_poll(&code("GHIJKL")).await.expect("").is_none());
}

#[tokio::test]
async fn it_lists_only_polls_of_the_teacher() {
    let dir = tempfile::tempdir().expect("");
    let store = FileStore::open(dir.path()).await.expect("");
    for (raw, teacher) in [("AAAAAA", "t1"), ("BBBBBB", "t2"), ("CCCCCC", "t1")] {
        store
            .insert_poll(&Poll::new(code(raw), teacher.into()))
            .await
            .expect("");
    }
    let polls = store.list_polls_by_teacher("t1").await.expect("");
    assert_eq!(polls.len(), 2);
    assert!(polls.iter().all(|p| p.teacher_id == "t1"));
    assert!(polls.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    assert!(store
        .list_chat_messages(&code("AAAAAA"))
        .await
        .expect("")
        .is_empty());
}

#[tokio::test]
async fn it_refuses_codes_that_alias_or_escape_the_store() {
    let dir = tempfile::tempdir().expect("");
    std::fs::write(dir.path().join("secret.json"), "{}").expect("");
    let store: Arc<dyn PollStore> =
        Arc::new(FileStore::open(dir.path().join("data")).await.expect(""));
    let coordinator = PollCoordinator::new(store);
    let poll = coordinator.create_poll("teacher-1").await.expect("");
    let canonical = poll.poll_code.to_string();

    for raw in [
        format!("./{}", canonical),
        format!("../polls/{}", canonical),
        format!("{}.json", canonical),
        "../../secret".to_string(),
        "AB\0CD".to_string(),
    ] {
        let err = PollCode::parse(&raw).expect_err(&raw);
        assert!(err.is_not_found(), "{:?}", raw);
    }

    for raw in [canonical.to_lowercase(), format!("  {} ", canonical)] {
        assert_eq!(PollCode::parse(&raw).expect(""), poll.poll_code);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn it_keeps_every_join_whatever_the_spelling_of_the_code() {
    let dir = tempfile::tempdir().expect("");
    let store: Arc<dyn PollStore> = Arc::new(FileStore::open(dir.path()).await.expect(""));
    let coordinator = Arc::new(PollCoordinator::new(store.clone()));
    let poll = coordinator.create_poll("teacher-1").await.expect("");
    let canonical = poll.poll_code.to_string();
    let spellings = [
        canonical.clone(),
        canonical.to_lowercase(),
        format!(" {} ", canonical),
    ];

    let mut handles = Vec::new();
    for _ in 0..10 {
        for raw in &spellings {
            let coordinator = coordinator.clone();
            let raw = raw.clone();
            handles.push(tokio::spawn(async move {
                let poll_code = PollCode::parse(&raw)?;
                coordinator
                    .student_join(&poll_code, "Ann", uuid::Uuid::new_v4())
                    .await?;
                Ok::<_, PollError>(())
            }));
        }
    }
    for handle in handles {
        handle.await.expect("").expect("");
    }

    let stored = store.find_poll(&poll.poll_code).await.expect("").expect("");
    assert_eq!(stored.active_students.len(), 30);
}
