use crate::test_support;
use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

async fn create_problem(
    ctx: &test_support::TestContext,
    token: &str,
    body: serde_json::Value,
) -> serde_json::Value {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/problems",
            Some(token),
            Some(body),
        ))
        .await
        .expect("create problem");
    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    created
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn create_problem_returns_ordered_questions_and_tags() {
    let ctx = test_support::setup_test_context().await;
    let teacher = test_support::insert_teacher(ctx.state.db(), "ada@example.com", "Ada").await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let created = create_problem(
        &ctx,
        &token,
        test_support::problem_body("Routing", &["graphs", "networks", "graphs"]),
    )
    .await;

    assert_eq!(created["summary"], "Routing");
    assert_eq!(created["creator_id"], teacher.id.as_str());
    assert_eq!(created["question_count"], 2);
    assert_eq!(created["total_points"], 3.0);
    assert_eq!(created["questions"][0]["statement"], "First question");
    assert_eq!(created["questions"][0]["position"], 0);
    assert_eq!(created["questions"][1]["position"], 1);
    assert_eq!(created["tags"], json!(["graphs", "networks"]));
    assert_eq!(created["deletable"], true);
    assert!(!created["fingerprint"].as_str().unwrap_or_default().is_empty());
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn create_problem_without_questions_is_rejected() {
    let ctx = test_support::setup_test_context().await;
    let teacher = test_support::insert_teacher(ctx.state.db(), "ada@example.com", "Ada").await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/problems",
            Some(&token),
            Some(json!({"summary": "Empty", "statement": "Nothing", "questions": []})),
        ))
        .await
        .expect("create problem");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn question_list_reconciles_and_renumbers() {
    let ctx = test_support::setup_test_context().await;
    let teacher = test_support::insert_teacher(ctx.state.db(), "ada@example.com", "Ada").await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let created =
        create_problem(&ctx, &token, test_support::problem_body("Sorting", &["algorithms"])).await;
    let problem_id = created["id"].as_str().expect("problem id").to_string();
    let first_id = created["questions"][0]["id"].as_str().expect("first").to_string();
    let second_id = created["questions"][1]["id"].as_str().expect("second").to_string();
    let fingerprint = created["fingerprint"].clone();

    // Drop the first question, keep the second with new points, append a new one.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/problems/{problem_id}"),
            Some(&token),
            Some(json!({
                "questions": [
                    {"id": second_id, "points": 5.0},
                    {"statement": "Third question", "answer": "x"}
                ]
            })),
        ))
        .await
        .expect("update problem");

    let status = response.status();
    let updated = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {updated}");
    assert_eq!(updated["question_count"], 2);
    assert_eq!(updated["questions"][0]["id"], second_id.as_str());
    assert_eq!(updated["questions"][0]["statement"], "Second question");
    assert_eq!(updated["questions"][0]["points"], 5.0);
    assert_eq!(updated["questions"][0]["position"], 0);
    assert_eq!(updated["questions"][1]["statement"], "Third question");
    assert_eq!(updated["questions"][1]["position"], 1);
    assert_ne!(updated["fingerprint"], fingerprint);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/questions/{first_id}"),
            Some(&token),
            None,
        ))
        .await
        .expect("get removed question");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn foreign_question_id_is_rejected_without_changes() {
    let ctx = test_support::setup_test_context().await;
    let teacher = test_support::insert_teacher(ctx.state.db(), "ada@example.com", "Ada").await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let first = create_problem(&ctx, &token, test_support::problem_body("One", &["misc"])).await;
    let second = create_problem(&ctx, &token, test_support::problem_body("Two", &["misc"])).await;
    let first_id = first["id"].as_str().expect("problem id");
    let foreign_question = second["questions"][0]["id"].as_str().expect("question id");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/problems/{first_id}"),
            Some(&token),
            Some(json!({
                "summary": "Renamed",
                "questions": [{"id": foreign_question, "statement": "Stolen"}]
            })),
        ))
        .await
        .expect("update problem");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/problems/{first_id}"),
            Some(&token),
            None,
        ))
        .await
        .expect("get problem");
    let detail = test_support::read_json(response).await;
    assert_eq!(detail["summary"], "One");
    assert_eq!(detail["question_count"], 2);
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn unused_tags_are_swept() {
    let ctx = test_support::setup_test_context().await;
    let teacher = test_support::insert_teacher(ctx.state.db(), "ada@example.com", "Ada").await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let created =
        create_problem(&ctx, &token, test_support::problem_body("Heaps", &["trees", "queues"]))
            .await;
    let problem_id = created["id"].as_str().expect("problem id");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/problems/{problem_id}"),
            Some(&token),
            Some(json!({"tags": ["trees"]})),
        ))
        .await
        .expect("update tags");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/v1/tags", Some(&token), None))
        .await
        .expect("list tags");
    let tags = test_support::read_json(response).await;
    let names: Vec<&str> = tags
        .as_array()
        .expect("tags array")
        .iter()
        .filter_map(|tag| tag["name"].as_str())
        .collect();
    assert_eq!(names, vec!["trees"]);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/problems/{problem_id}"),
            Some(&token),
            None,
        ))
        .await
        .expect("delete problem");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/tags", Some(&token), None))
        .await
        .expect("list tags");
    let tags = test_support::read_json(response).await;
    assert_eq!(tags, json!([]));
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn clone_appends_suffix_and_records_origin() {
    let ctx = test_support::setup_test_context().await;
    let owner = test_support::insert_teacher(ctx.state.db(), "ada@example.com", "Ada").await;
    let token = test_support::bearer_token(&owner.id, ctx.state.settings());

    let created =
        create_problem(&ctx, &token, test_support::problem_body("Parsing", &["grammars"])).await;
    let problem_id = created["id"].as_str().expect("problem id").to_string();

    for expected in ["Parsing.1", "Parsing.2"] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/problems/{problem_id}/clone"),
                Some(&token),
                None,
            ))
            .await
            .expect("clone problem");
        let status = response.status();
        let clone = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::CREATED, "response: {clone}");
        assert_eq!(clone["summary"], expected);
        assert_eq!(clone["origin_problem_id"], problem_id.as_str());
        assert_eq!(clone["tags"], json!(["grammars"]));
        assert_eq!(clone["question_count"], 2);
        assert_eq!(clone["fingerprint"], created["fingerprint"]);
    }

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/problems/{problem_id}"),
            Some(&token),
            None,
        ))
        .await
        .expect("get origin");
    let origin = test_support::read_json(response).await;
    assert_eq!(origin["derived_problem_ids"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn strangers_cannot_see_or_edit_problems() {
    let ctx = test_support::setup_test_context().await;
    let owner = test_support::insert_teacher(ctx.state.db(), "ada@example.com", "Ada").await;
    let stranger = test_support::insert_teacher(ctx.state.db(), "bob@example.com", "Bob").await;
    let owner_token = test_support::bearer_token(&owner.id, ctx.state.settings());
    let stranger_token = test_support::bearer_token(&stranger.id, ctx.state.settings());

    let created =
        create_problem(&ctx, &owner_token, test_support::problem_body("Private", &["secret"]))
            .await;
    let problem_id = created["id"].as_str().expect("problem id");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/problems/{problem_id}"),
            Some(&stranger_token),
            None,
        ))
        .await
        .expect("get problem");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/problems/{problem_id}"),
            Some(&stranger_token),
            Some(json!({"summary": "Mine now"})),
        ))
        .await
        .expect("update problem");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/problems",
            Some(&stranger_token),
            None,
        ))
        .await
        .expect("list problems");
    assert_eq!(test_support::read_json(response).await, json!([]));
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn list_filters_by_tags_and_rejects_unknown_order() {
    let ctx = test_support::setup_test_context().await;
    let teacher = test_support::insert_teacher(ctx.state.db(), "ada@example.com", "Ada").await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    create_problem(&ctx, &token, test_support::problem_body("Both", &["a", "b"])).await;
    create_problem(&ctx, &token, test_support::problem_body("OnlyA", &["a"])).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/problems?tags=a,b",
            Some(&token),
            None,
        ))
        .await
        .expect("list problems");
    let listed = test_support::read_json(response).await;
    let summaries: Vec<&str> = listed
        .as_array()
        .expect("problems array")
        .iter()
        .filter_map(|problem| problem["summary"].as_str())
        .collect();
    assert_eq!(summaries, vec!["Both"]);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/problems?tags=b,b",
            Some(&token),
            None,
        ))
        .await
        .expect("list problems");
    let listed = test_support::read_json(response).await;
    let summaries: Vec<&str> = listed
        .as_array()
        .expect("problems array")
        .iter()
        .filter_map(|problem| problem["summary"].as_str())
        .collect();
    assert_eq!(summaries, vec!["Both"]);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/problems?order=popularity",
            Some(&token),
            None,
        ))
        .await
        .expect("list problems");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
