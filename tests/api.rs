mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use common::*;
use ebd_gestao::{models::user::SessionUser, services::settings_service, web::mw_auth::SESSION_USER_KEY};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::{collections::HashMap, time::Duration};
use time::OffsetDateTime;
use tower::ServiceExt;
use tower_sessions::{
    session::{Id, Record},
    MemoryStore, SessionStore,
};

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.expect("resposta")
}

/// Cookies devolvidos pela resposta, prontos para o cabeçalho `Cookie`.
fn cookies_of(response: &Response) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

async fn login(app: &Router, username: &str, password: &str, role: &str) -> Response {
    let form = format!("username={}&password={}&role={}", username, password, role);
    send(
        app,
        Request::builder()
            .method(Method::POST)
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap(),
    )
    .await
}

async fn login_cookie(app: &Router, username: &str, password: &str, role: &str) -> String {
    let response = login(app, username, password, role).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER, "login de {}", username);
    cookies_of(&response)
}

fn api(method: Method, uri: &str, cookie: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri).header(header::COOKIE, cookie);
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.expect("corpo").to_bytes();
    serde_json::from_slice(&bytes).expect("json")
}

async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.expect("corpo").to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8")
}

#[tokio::test]
async fn anonymous_requests_are_turned_away() {
    let app = test_app(test_pool().await);

    let response = send(&app, Request::get("/api/classes").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Login necessário.");

    let response = send(&app, Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");
}

#[tokio::test]
async fn wrong_password_re_renders_the_login_form() {
    let app = test_app(test_pool().await);
    let response = login(&app, SECRETARY_USERNAME, "errada", "secretario").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let html = body_text(response).await;
    assert!(html.contains("Utilizador ou senha inválidos."));
    assert!(html.contains(&format!("value=\"{}\"", SECRETARY_USERNAME)));
}

#[tokio::test]
async fn secretary_runs_a_sunday() {
    let app = test_app(test_pool().await);
    let cookie = login_cookie(&app, SECRETARY_USERNAME, SECRETARY_PASSWORD, "secretario").await;

    let me = body_json(send(&app, api(Method::GET, "/api/me", &cookie, None)).await).await;
    assert_eq!(me["role"], "secretario");

    let response = send(&app, api(Method::POST, "/api/classes", &cookie, Some(json!({ "name": "Kids A" })))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let class_id = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = send(
        &app,
        api(
            Method::POST,
            &format!("/api/classes/{}/students", class_id),
            &cookie,
            Some(json!({ "name": "Ana", "birthday": "2015-07-20" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let student_id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["birthday"]["month"], 7);

    let response = send(
        &app,
        api(
            Method::POST,
            &format!("/api/classes/{}/attendance", class_id),
            &cookie,
            Some(json!({ "date": "2024-05-05", "marks": [{ "student_id": student_id, "present": true }] })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let sheet = body_json(
        send(
            &app,
            api(Method::GET, &format!("/api/classes/{}/attendance?date=2024-05-05", class_id), &cookie, None),
        )
        .await,
    )
    .await;
    assert_eq!(sheet["week"], 6);
    assert_eq!(sheet["entries"][0]["present"], true);

    let classes = body_json(send(&app, api(Method::GET, "/api/classes", &cookie, None)).await).await;
    assert_eq!(classes.as_array().unwrap().len(), 1);
    assert_eq!(classes[0]["inventory"]["bibles"], 0);
    assert_eq!(classes[0]["students"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn teachers_cannot_use_secretary_routes() {
    let pool = test_pool().await;
    professor(&pool, "ana").await;
    let other = class_named(&pool, "Outra", &[]).await;
    let app = test_app(pool);
    let cookie = login_cookie(&app, "ana", "senha123", "professor").await;

    let response = send(&app, api(Method::POST, "/api/classes", &cookie, Some(json!({ "name": "Nova" })))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app, api(Method::GET, "/api/users", &cookie, None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app, api(Method::GET, &format!("/api/classes/{}/students", other.id), &cookie, None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let classes = body_json(send(&app, api(Method::GET, "/api/classes", &cookie, None)).await).await;
    assert!(classes.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn registration_then_login_prefills_the_username() {
    let app = test_app(test_pool().await);
    let register = |username: &str| {
        Request::post("/api/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "username": username, "name": "Bia", "password": "senha123" }).to_string(),
            ))
            .unwrap()
    };

    assert_eq!(send(&app, register("bia")).await.status(), StatusCode::CREATED);
    assert_eq!(send(&app, register("bia")).await.status(), StatusCode::CONFLICT);

    let cookies = login_cookie(&app, "bia", "senha123", "professor").await;
    // Só o cookie assinado do último utilizador, sem a sessão
    let remembered: String = cookies
        .split("; ")
        .filter(|c| c.starts_with("ebd_last_username="))
        .collect();
    assert!(!remembered.is_empty());

    let response = send(
        &app,
        Request::get("/login").header(header::COOKIE, remembered).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("value=\"bia\""));
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = test_app(test_pool().await);
    let cookie = login_cookie(&app, SECRETARY_USERNAME, SECRETARY_PASSWORD, "secretario").await;

    let response = send(&app, api(Method::GET, "/logout", &cookie, None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = send(&app, api(Method::GET, "/api/me", &cookie, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn legacy_secretary_session_is_rewritten_with_the_current_id() {
    let pool = test_pool().await;
    let current = secretary(&pool).await;
    let store = MemoryStore::default();
    let app = app_with(test_state(pool, Duration::from_secs(60)), store.clone());

    let legacy = SessionUser { id: settings_service::LEGACY_SECRETARY_ID.to_string(), ..current.clone() };
    let mut record = Record {
        id: Id::default(),
        data: HashMap::from([(SESSION_USER_KEY.to_string(), serde_json::to_value(&legacy).unwrap())]),
        expiry_date: OffsetDateTime::now_utc() + time::Duration::hours(1),
    };
    store.create(&mut record).await.unwrap();
    let cookie = format!("id={}", record.id);

    let me = body_json(send(&app, api(Method::GET, "/api/me", &cookie, None)).await).await;
    assert_eq!(me["id"], current.id.as_str());

    // A sessão guardada já tem o id novo
    let stored = store.load(&record.id).await.unwrap().expect("sessão guardada");
    assert_eq!(stored.data[SESSION_USER_KEY]["id"], current.id.as_str());
}

#[tokio::test]
async fn deleting_a_class_drops_the_replies_of_its_announcements() {
    let pool = test_pool().await;
    let state = test_state(pool, Duration::from_secs(60));
    let app = app_with(state.clone(), MemoryStore::default());
    let cookie = login_cookie(&app, SECRETARY_USERNAME, SECRETARY_PASSWORD, "secretario").await;

    let response = send(&app, api(Method::POST, "/api/classes", &cookie, Some(json!({ "name": "Jovens" })))).await;
    let class_id = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = send(
        &app,
        api(
            Method::POST,
            "/api/announcements",
            &cookie,
            Some(json!({
                "title": "Retiro",
                "content": "Sábado às 8h",
                "target": { "scope": "class", "class_id": class_id }
            })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let announcement_id = body_json(response).await[0]["id"].as_str().unwrap().to_string();

    let response = send(
        &app,
        api(
            Method::POST,
            &format!("/api/announcements/{}/replies", announcement_id),
            &cookie,
            Some(json!({ "content": "Eu vou!" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(state.replies.list(&announcement_id).await.len(), 1);

    let response = send(&app, api(Method::DELETE, &format!("/api/classes/{}", class_id), &cookie, None)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(state.replies.list(&announcement_id).await.is_empty());
}
