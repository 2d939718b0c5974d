use axum::http::{Method, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::test_support;

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(test_support::json_request(method, uri, body))
        .await
        .expect("response");
    let status = response.status();
    (status, test_support::read_json(response).await)
}

async fn create_quiz(app: &Router, body: Value) -> String {
    let (status, created) = call(app, Method::POST, "/api/v1/quizzes", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    created["id"].as_str().expect("quiz id").to_string()
}

async fn assign(app: &Router, quiz_id: &str, questions: Value, learners: &[&str]) {
    let (status, body) = call(
        app,
        Method::POST,
        &format!("/api/v1/quizzes/{quiz_id}/questions"),
        Some(json!({ "questions": questions })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {body}");

    let (status, body) = call(
        app,
        Method::POST,
        &format!("/api/v1/quizzes/{quiz_id}/learners"),
        Some(json!({ "learner_ids": learners })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
}

fn open_quiz(title: &str, total_marks: i32, random_order: bool) -> Value {
    json!({
        "title": title,
        "duration_minutes": 30,
        "total_marks": total_marks,
        "start_time": "2020-01-01T00:00:00Z",
        "random_order": random_order
    })
}

fn question_ids(paper: &Value) -> Vec<String> {
    paper["questions"]
        .as_array()
        .expect("questions")
        .iter()
        .map(|question| question["question_id"].as_str().expect("question id").to_string())
        .collect()
}

#[tokio::test]
async fn start_is_idempotent_and_keeps_assignment_order() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let q1 = test_support::insert_question(db, "TRUE_FALSE", "Sky is blue", Some("True"), &[
        ("True", true),
        ("False", false),
    ])
    .await;
    let q2 = test_support::insert_question(db, "FILL_BLANK", "Creator", Some(r#"["Guido"]"#), &[])
        .await;
    let q3 = test_support::insert_question(db, "MCQ", "2+2", None, &[("3", false), ("4", true)])
        .await;

    let quiz_id = create_quiz(&ctx.app, open_quiz("Canonical", 3, false)).await;
    assign(
        &ctx.app,
        &quiz_id,
        json!([{ "question_id": q1 }, { "question_id": q2 }, { "question_id": q3 }]),
        &["learner-1"],
    )
    .await;

    let start_uri = format!("/api/v1/quizzes/{quiz_id}/attempts/learner-1");
    let (status, first) = call(&ctx.app, Method::POST, &start_uri, None).await;
    assert_eq!(status, StatusCode::CREATED, "response: {first}");
    let (status, second) = call(&ctx.app, Method::POST, &start_uri, None).await;
    assert_eq!(status, StatusCode::OK, "response: {second}");
    assert_eq!(first["attempt_id"], second["attempt_id"]);

    let attempts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attempts WHERE quiz_id = $1")
        .bind(&quiz_id)
        .fetch_one(db)
        .await
        .expect("count attempts");
    assert_eq!(attempts, 1);

    let (status, paper) =
        call(&ctx.app, Method::GET, &format!("{start_uri}/questions"), None).await;
    assert_eq!(status, StatusCode::OK, "response: {paper}");
    assert_eq!(question_ids(&paper), vec![q1, q2, q3]);
    assert!(paper["questions"][1].get("options").is_none());
    assert_eq!(paper["questions"][2]["options"], json!([{ "text": "3" }, { "text": "4" }]));
}

#[tokio::test]
async fn randomized_order_is_stable_across_reads() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let mut assigned = Vec::new();
    for index in 0..8 {
        let text = format!("Question {index}");
        assigned.push(test_support::insert_question(db, "TRUE_FALSE", &text, Some("True"), &[]).await);
    }

    let quiz_id = create_quiz(&ctx.app, open_quiz("Shuffled", 8, true)).await;
    let questions: Vec<Value> = assigned.iter().map(|id| json!({ "question_id": id })).collect();
    assign(&ctx.app, &quiz_id, Value::from(questions), &["learner-1"]).await;

    let start_uri = format!("/api/v1/quizzes/{quiz_id}/attempts/learner-1");
    let (status, _) = call(&ctx.app, Method::POST, &start_uri, None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, first) = call(&ctx.app, Method::GET, &format!("{start_uri}/questions"), None).await;
    let (_, second) = call(&ctx.app, Method::GET, &format!("{start_uri}/questions"), None).await;
    let first = question_ids(&first);
    assert_eq!(first, question_ids(&second));

    let mut sorted = first.clone();
    sorted.sort();
    let mut expected = assigned.clone();
    expected.sort();
    assert_eq!(sorted, expected);
}

#[tokio::test]
async fn weighted_mcq_scales_to_total_and_cannot_be_resubmitted() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let q1 = test_support::insert_question(db, "MCQ", "Capital of France", None, &[
        ("Paris", true),
        ("Rome", false),
    ])
    .await;

    let quiz_id = create_quiz(&ctx.app, open_quiz("Weighted", 10, false)).await;
    assign(&ctx.app, &quiz_id, json!([{ "question_id": q1, "mark": 5 }]), &["right", "wrong"])
        .await;

    for learner in ["right", "wrong"] {
        let (status, _) = call(
            &ctx.app,
            Method::POST,
            &format!("/api/v1/quizzes/{quiz_id}/attempts/{learner}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let submit_uri = format!("/api/v1/quizzes/{quiz_id}/attempts/right/submit");
    let (status, submitted) = call(
        &ctx.app,
        Method::POST,
        &submit_uri,
        Some(json!({ "answers": { q1.clone(): "Paris", "not-on-paper": "x" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {submitted}");
    assert_eq!(submitted["score"], 10.0);
    assert_eq!(submitted["raw_score"], 5);
    assert_eq!(submitted["max_raw_score"], 5);

    let (status, again) = call(
        &ctx.app,
        Method::POST,
        &submit_uri,
        Some(json!({ "answers": { q1.clone(): "Rome" } })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {again}");
    assert_eq!(again["detail"], "Quiz already submitted");

    let stored: Vec<String> = sqlx::query_scalar(
        "SELECT a.given_answer FROM answer_records a
         JOIN attempts t ON t.id = a.attempt_id
         WHERE t.quiz_id = $1 AND t.learner_id = 'right'",
    )
    .bind(&quiz_id)
    .fetch_all(db)
    .await
    .expect("answer records");
    assert_eq!(stored, vec!["Paris".to_string()]);

    let (_, wrong) = call(
        &ctx.app,
        Method::POST,
        &format!("/api/v1/quizzes/{quiz_id}/attempts/wrong/submit"),
        Some(json!({ "answers": { q1.clone(): "Rome" } })),
    )
    .await;
    assert_eq!(wrong["score"], 0.0);
}

#[tokio::test]
async fn lifecycle_errors_map_to_statuses() {
    let ctx = test_support::setup_test_context().await;

    let (status, _) =
        call(&ctx.app, Method::POST, "/api/v1/quizzes/missing/attempts/learner-1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let quiz_id = create_quiz(&ctx.app, open_quiz("Errors", 5, false)).await;

    let (status, body) = call(
        &ctx.app,
        Method::POST,
        &format!("/api/v1/quizzes/{quiz_id}/attempts/learner-1/submit"),
        Some(json!({ "answers": {} })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Quiz not started");

    let (status, body) = call(
        &ctx.app,
        Method::GET,
        &format!("/api/v1/quizzes/{quiz_id}/attempts/ghost/summary"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Attempt not found");

    let (status, toggled) = call(
        &ctx.app,
        Method::POST,
        &format!("/api/v1/quizzes/{quiz_id}/toggle-status"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["status"], "COMPLETED");

    let (status, body) = call(
        &ctx.app,
        Method::POST,
        &format!("/api/v1/quizzes/{quiz_id}/attempts/learner-1"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Quiz is closed");

    let (_, reopened) = call(
        &ctx.app,
        Method::POST,
        &format!("/api/v1/quizzes/{quiz_id}/toggle-status"),
        None,
    )
    .await;
    assert_eq!(reopened["status"], "ACTIVE");

    let (_, hidden) = call(
        &ctx.app,
        Method::POST,
        &format!("/api/v1/quizzes/{quiz_id}/toggle-active"),
        None,
    )
    .await;
    assert_eq!(hidden["is_active"], false);

    let (status, _) = call(
        &ctx.app,
        Method::POST,
        &format!("/api/v1/quizzes/{quiz_id}/attempts/learner-1"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &ctx.app,
        Method::POST,
        &format!("/api/v1/quizzes/{quiz_id}/questions"),
        Some(json!({ "questions": [{ "question_id": "no-such-question" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Question no-such-question not found");
}

#[tokio::test]
async fn summary_reports_answers_and_live_statistics() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let mcq =
        test_support::insert_question(db, "MCQ", "2+2", None, &[("4", true), ("5", false)]).await;
    let multi = test_support::insert_question(db, "MULTI_SELECT", "Mutable types", None, &[
        ("List", true),
        ("Tuple", false),
        ("Dictionary", true),
    ])
    .await;
    let blank = test_support::insert_question(
        db,
        "FILL_BLANK",
        "Creator of Python",
        Some(r#"["Guido van Rossum"]"#),
        &[],
    )
    .await;

    let quiz_id = create_quiz(&ctx.app, open_quiz("Summary", 30, false)).await;
    assign(
        &ctx.app,
        &quiz_id,
        json!([{ "question_id": mcq }, { "question_id": multi }, { "question_id": blank }]),
        &["low", "mid", "high"],
    )
    .await;

    let submissions = [
        ("low", json!({ mcq.clone(): "4", multi.clone(): r#"["List"]"#, blank.clone(): "Larry" })),
        (
            "mid",
            json!({ mcq.clone(): "4", multi.clone(): r#"["Dictionary","List"]"#, blank.clone(): "Larry" }),
        ),
        (
            "high",
            json!({ mcq.clone(): "4", multi.clone(): r#"["List","Dictionary"]"#, blank.clone(): " guido van rossum " }),
        ),
    ];
    for (learner, answers) in submissions {
        let attempt_uri = format!("/api/v1/quizzes/{quiz_id}/attempts/{learner}");
        let (status, _) = call(&ctx.app, Method::POST, &attempt_uri, None).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = call(
            &ctx.app,
            Method::POST,
            &format!("{attempt_uri}/submit"),
            Some(json!({ "answers": answers })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
    }

    let (status, summary) = call(
        &ctx.app,
        Method::GET,
        &format!("/api/v1/quizzes/{quiz_id}/attempts/mid/summary"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {summary}");
    assert_eq!(summary["your_score"], 20.0);
    assert_eq!(summary["students_attempted"], 3);
    assert_eq!(summary["average_marks"], 20.0);
    assert_eq!(summary["median_marks"], 20.0);
    assert_eq!(summary["highest_marks"], 30.0);
    assert_eq!(summary["lowest_marks"], 10.0);

    let answers = summary["answers"].as_array().expect("answers");
    assert_eq!(answers.len(), 3);
    assert_eq!(answers[0]["correct_answer"], "4");
    assert_eq!(answers[1]["correct_answer"], json!(["List", "Dictionary"]));
    assert_eq!(answers[1]["is_correct"], true);
    assert_eq!(answers[2]["correct_answer"], "Guido van Rossum");
    assert_eq!(answers[2]["your_answer"], "Larry");
    assert_eq!(answers[2]["is_correct"], false);

    let (status, statistics) = call(
        &ctx.app,
        Method::GET,
        &format!("/api/v1/quizzes/{quiz_id}/statistics"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(statistics["students_attempted"], 3);
    assert_eq!(statistics["median_marks"], 20.0);
}

#[tokio::test]
async fn listing_sweeps_expired_quizzes_and_ranks_attempts() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let question =
        test_support::insert_question(db, "TRUE_FALSE", "Water is wet", Some("True"), &[]).await;

    let expired = create_quiz(
        &ctx.app,
        json!({
            "title": "Expired",
            "duration_minutes": 10,
            "total_marks": 10,
            "start_time": "2020-01-01T09:00:00Z",
            "end_time": "2020-01-01T10:00:00Z"
        }),
    )
    .await;
    let upcoming = create_quiz(
        &ctx.app,
        json!({
            "title": "Upcoming",
            "duration_minutes": 10,
            "total_marks": 10,
            "start_time": "2999-01-01T09:00:00Z"
        }),
    )
    .await;
    let open = create_quiz(&ctx.app, open_quiz("Open", 10, false)).await;
    let hidden = create_quiz(
        &ctx.app,
        json!({
            "title": "Hidden",
            "duration_minutes": 10,
            "total_marks": 10,
            "start_time": "2020-01-01T09:00:00Z",
            "is_active": false
        }),
    )
    .await;

    for quiz_id in [&expired, &upcoming, &open, &hidden] {
        assign(&ctx.app, quiz_id, json!([{ "question_id": question }]), &["alice", "bob"]).await;
    }

    for (learner, answer) in [("alice", "False"), ("bob", "true")] {
        let attempt_uri = format!("/api/v1/quizzes/{expired}/attempts/{learner}");
        let (status, _) = call(&ctx.app, Method::POST, &attempt_uri, None).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = call(
            &ctx.app,
            Method::POST,
            &format!("{attempt_uri}/submit"),
            Some(json!({ "answers": { question.clone(): answer } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, listing) =
        call(&ctx.app, Method::GET, "/api/v1/learners/alice/quizzes", None).await;
    assert_eq!(status, StatusCode::OK, "response: {listing}");

    let titles = |bucket: &str| -> Vec<String> {
        listing[bucket]
            .as_array()
            .expect("bucket")
            .iter()
            .map(|entry| entry["title"].as_str().expect("title").to_string())
            .collect()
    };
    assert_eq!(titles("active"), vec!["Open".to_string()]);
    assert_eq!(titles("upcoming"), vec!["Upcoming".to_string()]);
    assert_eq!(titles("completed"), vec!["Expired".to_string()]);

    let completed = &listing["completed"][0];
    assert_eq!(completed["status"], "COMPLETED");
    assert_eq!(completed["attempted"], true);
    assert_eq!(completed["score"], 0.0);
    assert_eq!(completed["position"], 2);
    assert!(listing["active"][0].get("position").is_none());

    let status: String = sqlx::query_scalar("SELECT status::text FROM quizzes WHERE id = $1")
        .bind(&expired)
        .fetch_one(db)
        .await
        .expect("quiz status");
    assert_eq!(status, "COMPLETED");
}

#[tokio::test]
async fn instructor_listing_is_newest_first() {
    let ctx = test_support::setup_test_context().await;

    let first = create_quiz(&ctx.app, open_quiz("First", 10, false)).await;
    let second = create_quiz(&ctx.app, open_quiz("Second", 20, true)).await;
    sqlx::query("UPDATE quizzes SET created_at = created_at - INTERVAL '1 hour' WHERE id = $1")
        .bind(&first)
        .execute(ctx.state.db())
        .await
        .expect("age quiz");

    let (status, listing) = call(&ctx.app, Method::GET, "/api/v1/quizzes", None).await;
    assert_eq!(status, StatusCode::OK, "response: {listing}");
    let quizzes = listing.as_array().expect("quizzes");
    assert_eq!(quizzes.len(), 2);
    assert_eq!(quizzes[0]["id"], second.as_str());
    assert_eq!(quizzes[0]["total_marks"], 20);
    assert_eq!(quizzes[0]["status"], "ACTIVE");
    assert_eq!(quizzes[0]["is_active"], true);
    assert_eq!(quizzes[1]["id"], first.as_str());

    let (status, page) = call(&ctx.app, Method::GET, "/api/v1/quizzes?skip=1&limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page.as_array().expect("page").len(), 1);
    assert_eq!(page[0]["id"], first.as_str());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_starts_create_a_single_attempt() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let question =
        test_support::insert_question(db, "TRUE_FALSE", "Racing", Some("True"), &[]).await;
    let quiz_id = create_quiz(&ctx.app, open_quiz("Race start", 10, true)).await;
    assign(&ctx.app, &quiz_id, json!([{ "question_id": question }]), &["racer"]).await;

    let start_uri = format!("/api/v1/quizzes/{quiz_id}/attempts/racer");
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let app = ctx.app.clone();
            let uri = start_uri.clone();
            tokio::spawn(async move { call(&app, Method::POST, &uri, None).await })
        })
        .collect();

    let mut created = 0;
    let mut attempt_ids = Vec::new();
    for handle in handles {
        let (status, body) = handle.await.expect("join");
        match status {
            StatusCode::CREATED => created += 1,
            StatusCode::OK => {}
            other => panic!("unexpected status {other}: {body}"),
        }
        attempt_ids.push(body["attempt_id"].as_str().expect("attempt id").to_string());
    }
    assert_eq!(created, 1);
    attempt_ids.dedup();
    assert_eq!(attempt_ids.len(), 1);

    let attempts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attempts WHERE quiz_id = $1")
        .bind(&quiz_id)
        .fetch_one(db)
        .await
        .expect("count attempts");
    assert_eq!(attempts, 1);

    let frozen: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attempt_questions")
        .fetch_one(db)
        .await
        .expect("count frozen order");
    assert_eq!(frozen, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submits_grade_once() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let question =
        test_support::insert_question(db, "TRUE_FALSE", "Racing", Some("True"), &[]).await;
    let quiz_id = create_quiz(&ctx.app, open_quiz("Race submit", 10, false)).await;
    assign(&ctx.app, &quiz_id, json!([{ "question_id": question }]), &["racer"]).await;

    let attempt_uri = format!("/api/v1/quizzes/{quiz_id}/attempts/racer");
    let (status, _) = call(&ctx.app, Method::POST, &attempt_uri, None).await;
    assert_eq!(status, StatusCode::CREATED);

    let submit_uri = format!("{attempt_uri}/submit");
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let app = ctx.app.clone();
            let uri = submit_uri.clone();
            let answers = json!({ "answers": { question.clone(): "True" } });
            tokio::spawn(async move { call(&app, Method::POST, &uri, Some(answers)).await })
        })
        .collect();

    let mut statuses = Vec::new();
    for handle in handles {
        let (status, _) = handle.await.expect("join");
        statuses.push(status);
    }
    assert_eq!(statuses.iter().filter(|status| **status == StatusCode::OK).count(), 1);
    assert_eq!(statuses.iter().filter(|status| **status == StatusCode::CONFLICT).count(), 7);

    let records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM answer_records")
        .fetch_one(db)
        .await
        .expect("count answer records");
    assert_eq!(records, 1);
}
