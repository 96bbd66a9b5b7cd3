use crate::test_support;
use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

async fn send(
    ctx: &test_support::TestContext,
    method: Method,
    uri: &str,
    token: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(method, uri, Some(token), body))
        .await
        .expect("response");
    let status = response.status();
    if status == StatusCode::NO_CONTENT {
        return (status, serde_json::Value::Null);
    }
    (status, test_support::read_json(response).await)
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn admin_creates_and_updates_teacher() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "root@example.com", "Root").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let (status, created) = send(
        &ctx,
        Method::POST,
        "/api/v1/teachers",
        &token,
        Some(json!({"name": "Grace", "email": "Grace@Example.com", "password": "long-enough"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["email"], "grace@example.com");
    assert_eq!(created["role"], "teacher");
    let teacher_id = created["id"].as_str().expect("teacher id").to_string();

    let (status, updated) = send(
        &ctx,
        Method::PATCH,
        &format!("/api/v1/teachers/{teacher_id}"),
        &token,
        Some(json!({"name": "Grace Hopper"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {updated}");
    assert_eq!(updated["name"], "Grace Hopper");

    let (status, duplicate) = send(
        &ctx,
        Method::POST,
        "/api/v1/teachers",
        &token,
        Some(json!({"name": "Again", "email": "grace@example.com", "password": "long-enough"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {duplicate}");
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn teachers_cannot_manage_colleagues() {
    let ctx = test_support::setup_test_context().await;
    let ada = test_support::insert_teacher(ctx.state.db(), "ada@example.com", "Ada").await;
    let bob = test_support::insert_teacher(ctx.state.db(), "bob@example.com", "Bob").await;
    test_support::insert_admin(ctx.state.db(), "root@example.com", "Root").await;
    let token = test_support::bearer_token(&ada.id, ctx.state.settings());

    let (status, _) = send(
        &ctx,
        Method::POST,
        "/api/v1/teachers",
        &token,
        Some(json!({"name": "Eve", "email": "eve@example.com", "password": "long-enough"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) =
        send(&ctx, Method::GET, &format!("/api/v1/teachers/{}", bob.id), &token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &ctx,
        Method::PATCH,
        &format!("/api/v1/teachers/{}", ada.id),
        &token,
        Some(json!({"role": "admin"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, listed) = send(&ctx, Method::GET, "/api/v1/teachers", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = listed.as_array().expect("teachers array");
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|entry| entry.get("email").is_none()));
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn deleting_teacher_cascades_and_reassigns_exams() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "root@example.com", "Root").await;
    let ada = test_support::insert_teacher(ctx.state.db(), "ada@example.com", "Ada").await;
    let admin_token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let ada_token = test_support::bearer_token(&ada.id, ctx.state.settings());

    let (status, problem) = send(
        &ctx,
        Method::POST,
        "/api/v1/problems",
        &ada_token,
        Some(test_support::problem_body("Leaving", &["orphan"])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {problem}");
    let problem_id = problem["id"].as_str().expect("problem id").to_string();

    let (status, circle) =
        send(&ctx, Method::POST, "/api/v1/circles", &ada_token, Some(json!({"name": "Staff"})))
            .await;
    assert_eq!(status, StatusCode::CREATED, "response: {circle}");

    let (status, exam) =
        send(&ctx, Method::POST, "/api/v1/exams", &ada_token, Some(test_support::exam_body()))
            .await;
    assert_eq!(status, StatusCode::CREATED, "response: {exam}");
    let exam_id = exam["id"].as_str().expect("exam id").to_string();

    let (status, _) = send(
        &ctx,
        Method::POST,
        &format!("/api/v1/exams/{exam_id}/problems/{problem_id}"),
        &ada_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, report) =
        send(&ctx, Method::DELETE, &format!("/api/v1/teachers/{}", ada.id), &admin_token, None)
            .await;
    assert_eq!(status, StatusCode::OK, "response: {report}");
    assert_eq!(report["problems"], 1);
    assert_eq!(report["circles"], 1);
    assert_eq!(report["reassigned_exams"], 1);
    assert_eq!(report["swept_tags"], 1);

    let (status, exam) =
        send(&ctx, Method::GET, &format!("/api/v1/exams/{exam_id}"), &admin_token, None).await;
    assert_eq!(status, StatusCode::OK, "response: {exam}");
    assert_eq!(exam["creator_id"], admin.id.as_str());
    assert_eq!(exam["problems"], json!([]));

    let (status, _) =
        send(&ctx, Method::GET, &format!("/api/v1/problems/{problem_id}"), &admin_token, None)
            .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, tags) = send(&ctx, Method::GET, "/api/v1/tags", &admin_token, None).await;
    assert_eq!(tags, json!([]));
}

#[tokio::test]
#[ignore = "requires postgres"]
async fn deletion_refused_while_problems_are_locked() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "root@example.com", "Root").await;
    let ada = test_support::insert_teacher(ctx.state.db(), "ada@example.com", "Ada").await;
    let admin_token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let ada_token = test_support::bearer_token(&ada.id, ctx.state.settings());

    let (_, problem) = send(
        &ctx,
        Method::POST,
        "/api/v1/problems",
        &ada_token,
        Some(test_support::problem_body("Locked", &["exams"])),
    )
    .await;
    let problem_id = problem["id"].as_str().expect("problem id").to_string();
    let (_, exam) =
        send(&ctx, Method::POST, "/api/v1/exams", &ada_token, Some(test_support::exam_body()))
            .await;
    let exam_id = exam["id"].as_str().expect("exam id").to_string();

    send(
        &ctx,
        Method::POST,
        &format!("/api/v1/exams/{exam_id}/problems/{problem_id}"),
        &ada_token,
        None,
    )
    .await;
    let (status, _) = send(
        &ctx,
        Method::PATCH,
        &format!("/api/v1/exams/{exam_id}"),
        &ada_token,
        Some(json!({"state": "closed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) =
        send(&ctx, Method::DELETE, &format!("/api/v1/teachers/{}", ada.id), &admin_token, None)
            .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) =
        send(&ctx, Method::DELETE, &format!("/api/v1/teachers/{}", admin.id), &admin_token, None)
            .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
