// src/web/realtime_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        message::Message as ChatMessage,
        realtime::{ChangeEvent, ChannelStatus, ClientAction, ConnectionIndicator, ServerMessage, Table, ViewKind},
        user::SessionUser,
    },
    realtime::{topic_channel_name, view_channel_name, ChannelSet},
    services::{class_service, message_service, user_service},
    state::AppState,
    web::mw_secretary::ensure_secretary,
};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension, State,
    },
    response::IntoResponse,
};
use futures_util::{
    stream::{Stream, StreamExt},
    SinkExt,
};
use std::{collections::HashSet, time::Duration};
use tokio::{
    sync::mpsc,
    time::{sleep, Instant},
};

/// Tempo dado à task de envio para esvaziar a fila antes de fechar.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

type Outbox = mpsc::Sender<Message>;

/// Upgrade para websocket. Protegido por `require_auth`.
pub async fn realtime_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> impl IntoResponse {
    tracing::info!("Tentativa de upgrade WebSocket de tempo real por {}", user.id);
    ws.on_upgrade(move |socket| handle_socket(socket, state, user))
}

async fn handle_socket(socket: WebSocket, state: AppState, user: SessionUser) {
    let (mut ws_sender, ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(64);
    let user_id = user.id.clone();

    // --- Task 1: fila → cliente ---
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if ws_sender.send(msg).await.is_err() {
                tracing::warn!("Falha ao enviar msg WS para {}, terminando send_task.", user_id);
                break;
            }
            if closing {
                break;
            }
        }
    });

    // --- Task 2: ações do cliente + eventos do hub ---
    let mut recv_task = tokio::spawn(serve_connection(state, user, ws_receiver, tx));

    tokio::select! {
        // Se a recv_task for abortada, a sua fila no hub fecha e é limpa no próximo publish
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => {
            // A fila fecha com a recv_task; deixa o envio esvaziar
            if tokio::time::timeout(DRAIN_TIMEOUT, &mut send_task).await.is_err() {
                send_task.abort();
            }
        }
    };
}

/// Turmas cujas linhas em bruto a conexão pode receber. `None` = todas.
type ClassReach = Option<HashSet<String>>;

async fn load_reach(state: &AppState, user: &SessionUser) -> ClassReach {
    if user.is_secretary() {
        return None;
    }
    match user_service::class_ids_for(&state.db_pool, &user.id).await {
        Ok(ids) => Some(ids.into_iter().collect()),
        Err(e) => {
            tracing::warn!("Falha ao carregar as turmas de {}: {:?}", user.id, e);
            Some(HashSet::new())
        }
    }
}

/// Uma conexão de tempo real, do registo no hub até ao fecho. `incoming` são
/// as mensagens do cliente; o que o servidor envia sai por `tx`.
pub async fn serve_connection<S>(state: AppState, user: SessionUser, incoming: S, tx: mpsc::Sender<Message>)
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let (conn_id, events) = state.realtime.register().await;
    tracing::info!("🔌 Nova conexão de tempo real: {} ({})", conn_id, user.id);

    run_connection(&state, &user, incoming, events, &tx).await;

    state.realtime.unregister(&conn_id).await;
    tracing::info!("🔌 Conexão de tempo real {} fechada.", conn_id);
}

async fn run_connection<S>(
    state: &AppState,
    user: &SessionUser,
    mut incoming: S,
    mut events: mpsc::Receiver<ChangeEvent>,
    tx: &Outbox,
) where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let mut channels = ChannelSet::default();
    let mut reach = load_reach(state, user).await;
    let idle_timeout = state.realtime_idle_timeout;
    let idle = sleep(idle_timeout);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            msg = incoming.next() => {
                idle.as_mut().reset(Instant::now() + idle_timeout);
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("<- WS de {}: {}", user.id, text.as_str());
                        match serde_json::from_str::<ClientAction>(text.as_str()) {
                            Ok(action) => {
                                if !handle_action(state, user, &mut channels, action, tx).await {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::warn!("Mensagem WS inválida de {}: {}", user.id, e);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("Cliente {} enviou Close frame.", user.id);
                        break;
                    }
                    Some(Ok(_)) => tracing::trace!("Ignorando msg WS não-texto de {}", user.id),
                    Some(Err(e)) => {
                        tracing::warn!("Erro no websocket de {}: {}", user.id, e);
                        break;
                    }
                    None => break,
                }
            }
            Some(event) = events.recv() => {
                // Junta tudo o que já está na fila: uma releitura por vista
                let mut batch = vec![event];
                while let Ok(more) = events.try_recv() {
                    batch.push(more);
                }
                if reach.is_some() && batch.iter().any(|e| matches!(e.table, Table::ClassTeachers | Table::Classes)) {
                    reach = load_reach(state, user).await;
                }
                if !handle_events(state, user, &mut channels, reach.as_ref(), batch, tx).await {
                    break;
                }
            }
            _ = &mut idle => {
                tracing::info!("⏱️ Conexão de {} inativa há {:?}.", user.id, idle_timeout);
                for channel in channels.time_out_all() {
                    let status = status_message(channel, ChannelStatus::TimedOut, ConnectionIndicator::Disconnected, None);
                    if !send(tx, &status).await {
                        break;
                    }
                }
                let _ = tx.send(Message::Close(None)).await;
                break;
            }
        }
    }

    let closed = channels.close_all();
    if !closed.is_empty() {
        tracing::debug!("Canais fechados para {}: {}", user.id, closed.join(", "));
    }
}

/// Processa uma ação do cliente. Devolve `false` se a conexão morreu.
async fn handle_action(
    state: &AppState,
    user: &SessionUser,
    channels: &mut ChannelSet,
    action: ClientAction,
    tx: &Outbox,
) -> bool {
    match action {
        ClientAction::Subscribe { topic, events } => {
            let status = channels.subscribe(topic, &events);
            send(tx, &status_message(topic_channel_name(topic), status, channels.indicator(), None)).await
        }
        ClientAction::Unsubscribe { topic } => {
            channels.unsubscribe(topic);
            send(
                tx,
                &status_message(topic_channel_name(topic), ChannelStatus::Closed, channels.indicator(), None),
            )
            .await
        }
        ClientAction::Watch { view } => {
            let status = channels.watch(view);
            if !send(tx, &status_message(view_channel_name(view), status, channels.indicator(), None)).await {
                return false;
            }
            refresh_view(state, user, channels, view, tx).await
        }
        ClientAction::Unwatch { view } => {
            channels.unwatch(view);
            send(
                tx,
                &status_message(view_channel_name(view), ChannelStatus::Closed, channels.indicator(), None),
            )
            .await
        }
        ClientAction::Ping => send(tx, &ServerMessage::Pong).await,
    }
}

/// Reencaminha os eventos subscritos e relê cada vista invalidada uma vez.
async fn handle_events(
    state: &AppState,
    user: &SessionUser,
    channels: &mut ChannelSet,
    reach: Option<&HashSet<String>>,
    batch: Vec<ChangeEvent>,
    tx: &Outbox,
) -> bool {
    let mut dirty: Vec<ViewKind> = Vec::new();
    let mut seen = HashSet::new();

    for event in batch {
        let visible = event_visible_to(&event, user, reach);
        if visible || event.table != Table::Messages {
            for view in channels.invalidated_views(event.table) {
                if seen.insert(view) {
                    dirty.push(view);
                }
            }
        }
        if visible && channels.wants(&event) && !send(tx, &ServerMessage::Change(event)).await {
            return false;
        }
    }

    for view in dirty {
        if !refresh_view(state, user, channels, view, tx).await {
            return false;
        }
    }
    true
}

/// Relê o agregado inteiro da vista e envia o snapshot.
async fn refresh_view(
    state: &AppState,
    user: &SessionUser,
    channels: &mut ChannelSet,
    view: ViewKind,
    tx: &Outbox,
) -> bool {
    let mut before = channels.view_status(view);
    if matches!(before, Some(ChannelStatus::Error | ChannelStatus::TimedOut)) {
        // Recuperação: volta a `connecting` antes de reler
        before = channels.set_view_status(view, ChannelStatus::Connecting);
        let status = status_message(view_channel_name(view), ChannelStatus::Connecting, channels.indicator(), None);
        if !send(tx, &status).await {
            return false;
        }
    }

    let (next, detail, snapshot) = match load_view(state, user, view).await {
        Ok(data) => (ChannelStatus::Subscribed, None, Some(ServerMessage::Snapshot { view, data })),
        Err(e) => {
            tracing::warn!("Falha ao reler a vista {:?} para {}: {:?}", view, user.id, e);
            (ChannelStatus::Error, Some(e.status_and_message().1), None)
        }
    };

    let Some(after) = channels.set_view_status(view, next) else {
        // Vista deixou de ser observada entretanto
        return true;
    };
    if before != Some(after) {
        let status = status_message(view_channel_name(view), after, channels.indicator(), detail);
        if !send(tx, &status).await {
            return false;
        }
    }
    match snapshot {
        Some(msg) => send(tx, &msg).await,
        None => true,
    }
}

async fn load_view(state: &AppState, user: &SessionUser, view: ViewKind) -> AppResult<serde_json::Value> {
    let data = match view {
        ViewKind::Classes => {
            let scope = class_service::ClassScope::for_user(user);
            serde_json::to_value(class_service::get_classes(&state.db_pool, &scope).await?)
        }
        ViewKind::Messages => serde_json::to_value(message_service::list_messages_for(&state.db_pool, user).await?),
        ViewKind::Users => {
            ensure_secretary(user)?;
            serde_json::to_value(user_service::find_all_users(&state.db_pool).await?)
        }
    };
    data.map_err(|e| {
        tracing::error!("Falha ao serializar a vista {:?}: {}", view, e);
        AppError::InternalServerError
    })
}

/// Quem pode receber o evento em bruto: recados só para quem participa,
/// contas e definições só para a secretaria, linhas de uma turma só para
/// quem a vê.
fn event_visible_to(event: &ChangeEvent, user: &SessionUser, reach: Option<&HashSet<String>>) -> bool {
    match event.table {
        Table::Users | Table::SystemSettings => user.is_secretary(),
        Table::Messages => event
            .new
            .as_ref()
            .and_then(|row| serde_json::from_value::<ChatMessage>(row.clone()).ok())
            .map_or(user.is_secretary(), |m| m.is_visible_to(&user.id, user.role)),
        table if table.is_class_scoped() => match reach {
            None => true,
            Some(classes) => event.class_id().is_some_and(|id| classes.contains(id)),
        },
        _ => true,
    }
}

fn status_message(
    channel: String,
    status: ChannelStatus,
    connection: ConnectionIndicator,
    detail: Option<String>,
) -> ServerMessage {
    ServerMessage::Status { channel, status, connection, detail }
}

async fn send(tx: &Outbox, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(text) => tx.send(Message::Text(text.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Erro ao serializar mensagem WS: {:?}", e);
            true
        }
    }
}
