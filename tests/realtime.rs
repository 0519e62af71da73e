mod common;

use axum::{
    body::Body,
    extract::ws::Message,
    http::{header, Method, Request, StatusCode},
};
use common::*;
use ebd_gestao::{
    models::{
        class::{Student, StudentPayload},
        realtime::{ChangeEvent, Table},
        user::SessionUser,
    },
    services::{class_service, student_service},
    state::AppState,
    web::realtime_handlers::serve_connection,
};
use futures_util::stream;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::timeout,
};
use tower::ServiceExt;
use tower_sessions::MemoryStore;

const WAIT: Duration = Duration::from_secs(2);

/// Cliente de teste ligado diretamente ao ciclo de vida da conexão.
struct Client {
    actions: mpsc::UnboundedSender<Result<Message, axum::Error>>,
    outbox: mpsc::Receiver<Message>,
    task: JoinHandle<()>,
}

fn connect(state: &AppState, user: SessionUser) -> Client {
    let (actions, mut incoming) = mpsc::unbounded_channel();
    let (tx, outbox) = mpsc::channel(64);
    let incoming = stream::poll_fn(move |cx| incoming.poll_recv(cx));
    let task = tokio::spawn(serve_connection(state.clone(), user, incoming, tx));
    Client { actions, outbox, task }
}

impl Client {
    fn act(&self, action: Value) {
        self.actions
            .send(Ok(Message::Text(action.to_string().into())))
            .expect("conexão viva");
    }

    async fn next_frame(&mut self) -> Message {
        timeout(WAIT, self.outbox.recv())
            .await
            .expect("mensagem dentro do prazo")
            .expect("fila aberta")
    }

    async fn next(&mut self) -> Value {
        match self.next_frame().await {
            Message::Text(text) => serde_json::from_str(text.as_str()).expect("json"),
            other => panic!("esperava texto, veio {:?}", other),
        }
    }

    async fn expect_status(&mut self, channel: &str, status: &str) -> Value {
        let msg = self.next().await;
        assert_eq!(msg["type"], "status", "{}", msg);
        assert_eq!(msg["channel"], channel, "{}", msg);
        assert_eq!(msg["status"], status, "{}", msg);
        msg
    }

    async fn expect_snapshot(&mut self, view: &str) -> Value {
        let msg = self.next().await;
        assert_eq!(msg["type"], "snapshot", "{}", msg);
        assert_eq!(msg["view"], view, "{}", msg);
        msg["data"].clone()
    }

    async fn watch(&mut self, view: &str) -> Value {
        self.act(json!({ "action": "watch", "view": view }));
        let channel = format!("view:{}", view);
        self.expect_status(&channel, "connecting").await;
        self.expect_status(&channel, "subscribed").await;
        self.expect_snapshot(view).await
    }

    async fn is_quiet(&mut self) -> bool {
        timeout(Duration::from_millis(300), self.outbox.recv()).await.is_err()
    }
}

async fn login_cookie(app: &axum::Router) -> String {
    let form = format!("username={}&password={}&role=secretario", SECRETARY_USERNAME, SECRETARY_PASSWORD);
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

fn student_event(student: &Student) -> ChangeEvent {
    ChangeEvent::insert(Table::Students, student)
}

async fn add_student(state: &AppState, class_id: &str, name: &str) -> Student {
    let (student, _) = student_service::create_student(
        &state.db_pool,
        class_id,
        &StudentPayload { name: name.to_string(), birthday: None, phone: None },
    )
    .await
    .unwrap();
    student
}

#[tokio::test]
async fn a_write_through_the_api_refreshes_the_watched_view() {
    let pool = test_pool().await;
    let state = test_state(pool, Duration::from_secs(60));
    let app = app_with(state.clone(), MemoryStore::default());
    let class = class_named(&state.db_pool, "Kids A", &[]).await;
    let sec = secretary(&state.db_pool).await;

    let mut client = connect(&state, sec);
    let data = client.watch("classes").await;
    assert_eq!(data[0]["name"], "Kids A");
    assert!(data[0]["students"].as_array().unwrap().is_empty());

    let cookie = login_cookie(&app).await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(format!("/api/classes/{}/students", class.id))
                .header(header::COOKIE, cookie)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "name": "Ana" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // O snapshot traz o agregado inteiro, com inventário a zeros
    let data = client.expect_snapshot("classes").await;
    assert_eq!(data[0]["students"][0]["name"], "Ana");
    assert_eq!(data[0]["inventory"]["bibles"], 0);
}

#[tokio::test]
async fn a_burst_of_events_is_one_refetch_per_view() {
    let pool = test_pool().await;
    let state = test_state(pool, Duration::from_secs(60));
    let class = class_named(&state.db_pool, "Jovens", &[]).await;
    let sec = secretary(&state.db_pool).await;

    let mut client = connect(&state, sec);
    client.watch("classes").await;

    let a = add_student(&state, &class.id, "Ana").await;
    let b = add_student(&state, &class.id, "Bia").await;
    state
        .realtime
        .publish_all(vec![
            student_event(&a),
            student_event(&b),
            ChangeEvent::update(Table::Inventory, &json!({ "class_id": class.id })),
        ])
        .await;

    let data = client.expect_snapshot("classes").await;
    assert_eq!(data[0]["students"].as_array().unwrap().len(), 2);
    assert!(client.is_quiet().await, "só uma releitura para três eventos");
}

#[tokio::test]
async fn failed_refetch_recovers_through_connecting() {
    let pool = test_pool().await;
    let state = test_state(pool, Duration::from_secs(60));
    let sec = secretary(&state.db_pool).await;

    let mut client = connect(&state, sec);
    client.watch("messages").await;

    sqlx::query("ALTER TABLE messages RENAME TO messages_fora")
        .execute(&state.db_pool)
        .await
        .unwrap();
    state.realtime.publish(ChangeEvent::insert(Table::Messages, &json!({ "id": "m1" }))).await;

    let status = client.expect_status("view:messages", "error").await;
    assert_eq!(status["detail"], "Erro ao aceder aos dados.");
    assert_eq!(status["connection"], "connecting");

    sqlx::query("ALTER TABLE messages_fora RENAME TO messages")
        .execute(&state.db_pool)
        .await
        .unwrap();
    state.realtime.publish(ChangeEvent::insert(Table::Messages, &json!({ "id": "m2" }))).await;

    client.expect_status("view:messages", "connecting").await;
    let status = client.expect_status("view:messages", "subscribed").await;
    assert_eq!(status["connection"], "connected");
    client.expect_snapshot("messages").await;
}

#[tokio::test]
async fn teachers_only_receive_rows_of_their_classes() {
    let pool = test_pool().await;
    let state = test_state(pool, Duration::from_secs(60));
    let ana = professor(&state.db_pool, "ana").await;
    let own = class_named(&state.db_pool, "Kids A", &[ana.id.clone()]).await;
    let other = class_named(&state.db_pool, "Adultos", &[]).await;

    let mut client = connect(&state, as_session(&ana));
    client.act(json!({ "action": "subscribe", "topic": "students" }));
    client.expect_status("realtime:students", "subscribed").await;

    let foreign = add_student(&state, &other.id, "Carlos").await;
    let mine = add_student(&state, &own.id, "Duda").await;
    state.realtime.publish(student_event(&foreign)).await;
    state.realtime.publish(student_event(&mine)).await;

    let change = client.next().await;
    assert_eq!(change["type"], "change");
    assert_eq!(change["new"]["class_id"], own.id.as_str());

    let removed = ChangeEvent::delete_in_class(Table::Students, &foreign.id, &other.id);
    state.realtime.publish(removed).await;
    assert!(client.is_quiet().await);

    // Passa a lecionar a outra turma
    class_service::set_class_teachers(&state.db_pool, &other.id, &[ana.id.clone()]).await.unwrap();
    state
        .realtime
        .publish(ChangeEvent::update(Table::ClassTeachers, &json!({ "class_id": other.id })))
        .await;
    let late = add_student(&state, &other.id, "Eva").await;
    state.realtime.publish(student_event(&late)).await;

    let change = client.next().await;
    assert_eq!(change["new"]["id"], late.id.as_str());
}

#[tokio::test]
async fn idle_connection_times_out_and_leaves_the_hub() {
    let pool = test_pool().await;
    let state = test_state(pool, Duration::from_millis(150));
    let sec = secretary(&state.db_pool).await;

    let mut client = connect(&state, sec);
    client.act(json!({ "action": "subscribe", "topic": "students" }));
    client.expect_status("realtime:students", "subscribed").await;
    assert_eq!(state.realtime.connection_count().await, 1);

    let status = client.expect_status("realtime:students", "timed_out").await;
    assert_eq!(status["connection"], "disconnected");
    assert!(matches!(client.next_frame().await, Message::Close(_)));

    timeout(WAIT, client.task).await.unwrap().unwrap();
    assert_eq!(state.realtime.connection_count().await, 0);
}

#[tokio::test]
async fn closing_the_socket_unregisters_the_connection() {
    let pool = test_pool().await;
    let state = test_state(pool, Duration::from_secs(60));
    let sec = secretary(&state.db_pool).await;

    let mut client = connect(&state, sec);
    client.act(json!({ "action": "ping" }));
    assert_eq!(client.next().await["type"], "pong");
    assert_eq!(state.realtime.connection_count().await, 1);

    client.actions.send(Ok(Message::Close(None))).unwrap();
    timeout(WAIT, client.task).await.unwrap().unwrap();
    assert_eq!(state.realtime.connection_count().await, 0);
}
