// tests/question_store_tests.rs

mod common;

use chrono::Utc;
use exam_server::{
    error::AppError,
    models::question::{CreateQuestionRequest, UpdateQuestionRequest},
    services::question_store,
};

use common::{question, test_pool};

#[tokio::test]
async fn three_questions_list_in_insertion_order() {
    let (pool, _) = test_pool().await;

    for prompt in ["first", "second", "third"] {
        question_store::add_question(&pool, &question("General", prompt, "x"), Utc::now())
            .await
            .unwrap();
    }

    let listed = question_store::list_questions(&pool).await.unwrap();
    let prompts: Vec<&str> = listed.iter().map(|q| q.prompt.as_str()).collect();
    let orders: Vec<i64> = listed.iter().map(|q| q.display_order).collect();
    assert_eq!(prompts, vec!["first", "second", "third"]);
    assert_eq!(orders, vec![1, 2, 3]);
}

#[tokio::test]
async fn deleted_orders_are_never_reused() {
    let (pool, _) = test_pool().await;
    let mut ids = Vec::new();
    for prompt in ["a", "b", "c"] {
        let q = question_store::add_question(&pool, &question("General", prompt, "x"), Utc::now())
            .await
            .unwrap();
        ids.push(q.id);
    }

    // Removing the newest row must not hand its order out again.
    question_store::delete_question(&pool, ids[2], Utc::now()).await.unwrap();
    question_store::delete_question(&pool, ids[1], Utc::now()).await.unwrap();

    let d = question_store::add_question(&pool, &question("General", "d", "x"), Utc::now())
        .await
        .unwrap();
    assert_eq!(d.display_order, 4);

    let orders: Vec<i64> = question_store::list_questions(&pool)
        .await
        .unwrap()
        .iter()
        .map(|q| q.display_order)
        .collect();
    assert_eq!(orders, vec![1, 4]);
}

#[tokio::test]
async fn concurrent_inserts_get_distinct_increasing_orders() {
    let (pool, _) = test_pool().await;

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let pool = pool.clone();
            tokio::spawn(async move {
                question_store::add_question(
                    &pool,
                    &question("General", &format!("q{i}"), "x"),
                    Utc::now(),
                )
                .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let listed = question_store::list_questions(&pool).await.unwrap();
    let orders: Vec<i64> = listed.iter().map(|q| q.display_order).collect();
    assert_eq!(orders, (1..=8).collect::<Vec<i64>>());
    // Order follows creation: ids and orders rise together.
    assert!(listed.windows(2).all(|w| w[0].id < w[1].id));
}

#[tokio::test]
async fn topic_defaults_and_prompt_is_sanitized() {
    let (pool, _) = test_pool().await;
    let req = CreateQuestionRequest {
        topic: None,
        prompt: "Name <b>this</b><script>x()</script>".to_string(),
        model_answer: "  <answer>  ".to_string(),
    };

    let q = question_store::add_question(&pool, &req, Utc::now()).await.unwrap();
    assert_eq!(q.topic, "General");
    assert_eq!(q.prompt, "Name <b>this</b>");
    // Model answers are stored verbatim apart from trimming.
    assert_eq!(q.model_answer, "<answer>");
}

#[tokio::test]
async fn topics_are_plain_text() {
    let (pool, _) = test_pool().await;
    let q = question_store::add_question(&pool, &question(" Q&A ", "Is 2 < 3?", "yes"), Utc::now())
        .await
        .unwrap();

    assert_eq!(q.topic, "Q&A");
    // Prompts are HTML fragments, so a bare `<` is escaped.
    assert_eq!(q.prompt, "Is 2 &lt; 3?");
}

#[tokio::test]
async fn blank_prompts_and_answers_are_rejected() {
    let (pool, _) = test_pool().await;

    for (prompt, answer) in [("   ", "a"), ("p", "   "), ("<script>x()</script>", "a")] {
        assert!(matches!(
            question_store::add_question(&pool, &question("General", prompt, answer), Utc::now())
                .await,
            Err(AppError::BadRequest(_))
        ));
    }
    assert!(question_store::list_questions(&pool).await.unwrap().is_empty());

    let q = question_store::add_question(&pool, &question("General", "p", "a"), Utc::now())
        .await
        .unwrap();
    let req = UpdateQuestionRequest {
        topic: None,
        prompt: None,
        model_answer: Some("\t \n".to_string()),
    };
    assert!(matches!(
        question_store::update_question(&pool, q.id, &req, Utc::now()).await,
        Err(AppError::BadRequest(_))
    ));
    assert_eq!(question_store::get_question(&pool, q.id).await.unwrap().model_answer, "a");

    let batch = vec![question("General", "ok", "a"), question("General", "ok too", " ")];
    assert!(matches!(
        question_store::import_questions(&pool, &batch, Utc::now()).await,
        Err(AppError::BadRequest(_))
    ));
    assert_eq!(question_store::list_questions(&pool).await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_changes_fields_but_not_order() {
    let (pool, _) = test_pool().await;
    let q = question_store::add_question(&pool, &question("Maths", "2+2?", "4"), Utc::now())
        .await
        .unwrap();

    let req = UpdateQuestionRequest {
        topic: Some("Arithmetic".to_string()),
        prompt: None,
        model_answer: Some("four".to_string()),
    };
    let updated = question_store::update_question(&pool, q.id, &req, Utc::now()).await.unwrap();

    assert_eq!(updated.topic, "Arithmetic");
    assert_eq!(updated.prompt, "2+2?");
    assert_eq!(updated.model_answer, "four");
    assert_eq!(updated.display_order, q.display_order);
    assert!(updated.updated_at.is_some());
}

#[tokio::test]
async fn missing_or_deleted_questions_are_not_found() {
    let (pool, _) = test_pool().await;
    let q = question_store::add_question(&pool, &question("General", "p", "a"), Utc::now())
        .await
        .unwrap();
    question_store::delete_question(&pool, q.id, Utc::now()).await.unwrap();

    assert!(matches!(
        question_store::get_question(&pool, q.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        question_store::delete_question(&pool, q.id, Utc::now()).await,
        Err(AppError::NotFound(_))
    ));

    let req = UpdateQuestionRequest {
        topic: None,
        prompt: Some("new".to_string()),
        model_answer: None,
    };
    assert!(matches!(
        question_store::update_question(&pool, 9999, &req, Utc::now()).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn import_appends_in_given_order() {
    let (pool, _) = test_pool().await;
    question_store::add_question(&pool, &question("General", "existing", "a"), Utc::now())
        .await
        .unwrap();

    let batch = vec![
        question("Physics", "p1", "a"),
        question("Physics", "p2", "b"),
    ];
    let created = question_store::import_questions(&pool, &batch, Utc::now()).await.unwrap();

    let orders: Vec<i64> = created.iter().map(|q| q.display_order).collect();
    assert_eq!(orders, vec![2, 3]);
    assert_eq!(created[1].prompt, "p2");
}
