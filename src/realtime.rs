// src/realtime.rs
//! Distribuição de eventos de alteração pelas conexões websocket.

use crate::models::realtime::{
    ChangeEvent, ChannelStatus, ConnectionIndicator, EventType, Table, ViewKind,
};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

/// Capacidade da fila de eventos de cada conexão.
const CONNECTION_BUFFER: usize = 256;

type EventTx = mpsc::Sender<ChangeEvent>;

/// Conexões websocket ativas, cada uma com a sua fila de eventos.
#[derive(Debug, Clone, Default)]
pub struct RealtimeHub {
    connections: Arc<Mutex<HashMap<Uuid, EventTx>>>,
}

impl RealtimeHub {
    /// Regista uma conexão nova e devolve o seu id e a fila de receção.
    pub async fn register(&self) -> (Uuid, mpsc::Receiver<ChangeEvent>) {
        let (tx, rx) = mpsc::channel(CONNECTION_BUFFER);
        let conn_id = Uuid::new_v4();
        self.connections.lock().await.insert(conn_id, tx);
        tracing::debug!("Conexão de tempo real {} registada.", conn_id);
        (conn_id, rx)
    }

    pub async fn unregister(&self, conn_id: &Uuid) {
        if self.connections.lock().await.remove(conn_id).is_some() {
            tracing::debug!("Conexão de tempo real {} removida.", conn_id);
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.lock().await.len()
    }

    /// Envia o evento para TODAS as conexões. Um cliente lento perde o evento
    /// em vez de travar quem escreveu; conexões fechadas são limpas.
    pub async fn publish(&self, event: ChangeEvent) {
        tracing::debug!("📣 {} {:?}", event.table, event.event_type);
        let mut connections = self.connections.lock().await;
        let mut closed = Vec::new();

        for (conn_id, tx) in connections.iter() {
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!("Fila da conexão {} cheia, evento descartado.", conn_id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*conn_id),
            }
        }

        for conn_id in closed {
            connections.remove(&conn_id);
        }
    }

    pub async fn publish_all(&self, events: Vec<ChangeEvent>) {
        for event in events {
            self.publish(event).await;
        }
    }
}

impl ChannelStatus {
    /// Transições permitidas: connecting → subscribed → (error | timed_out)
    /// → connecting; qualquer estado pode fechar.
    pub fn can_transition_to(self, next: ChannelStatus) -> bool {
        use ChannelStatus::*;
        matches!(
            (self, next),
            (Connecting, Subscribed)
                | (Subscribed, Error)
                | (Subscribed, TimedOut)
                | (Error, Connecting)
                | (TimedOut, Connecting)
                | (Connecting, Error)
                | (_, Closed)
        )
    }
}

#[derive(Debug, Clone)]
struct TopicChannel {
    events: HashSet<EventType>,
    status: ChannelStatus,
}

/// Canais lógicos abertos por uma conexão: um por coleção subscrita e um
/// por vista agregada observada.
#[derive(Debug, Default)]
pub struct ChannelSet {
    topics: HashMap<Table, TopicChannel>,
    views: HashMap<ViewKind, ChannelStatus>,
}

pub fn topic_channel_name(table: Table) -> String {
    format!("realtime:{}", table)
}

pub fn view_channel_name(view: ViewKind) -> String {
    match view {
        ViewKind::Classes => "view:classes".to_string(),
        ViewKind::Messages => "view:messages".to_string(),
        ViewKind::Users => "view:users".to_string(),
    }
}

impl ChannelSet {
    /// Abre (ou reabre) o canal de uma coleção. Sem filtro = todos os eventos.
    pub fn subscribe(&mut self, topic: Table, events: &[EventType]) -> ChannelStatus {
        let events: HashSet<EventType> = if events.is_empty() {
            [EventType::Insert, EventType::Update, EventType::Delete].into_iter().collect()
        } else {
            events.iter().copied().collect()
        };
        let channel = self.topics.entry(topic).or_insert(TopicChannel {
            events: HashSet::new(),
            status: ChannelStatus::Connecting,
        });
        channel.events = events;
        if channel.status.can_transition_to(ChannelStatus::Subscribed) {
            channel.status = ChannelStatus::Subscribed;
        }
        channel.status
    }

    pub fn unsubscribe(&mut self, topic: Table) -> bool {
        self.topics.remove(&topic).is_some()
    }

    /// Começa a observar uma vista. Fica `connecting` até ao primeiro snapshot.
    pub fn watch(&mut self, view: ViewKind) -> ChannelStatus {
        *self.views.entry(view).or_insert(ChannelStatus::Connecting)
    }

    pub fn unwatch(&mut self, view: ViewKind) -> bool {
        self.views.remove(&view).is_some()
    }

    pub fn watched_views(&self) -> Vec<ViewKind> {
        self.views.keys().copied().collect()
    }

    /// Aplica uma transição de estado a uma vista; transições inválidas passam
    /// primeiro por `connecting` (reconexão).
    pub fn set_view_status(&mut self, view: ViewKind, next: ChannelStatus) -> Option<ChannelStatus> {
        let status = self.views.get_mut(&view)?;
        if !status.can_transition_to(next) && status.can_transition_to(ChannelStatus::Connecting) {
            *status = ChannelStatus::Connecting;
        }
        if status.can_transition_to(next) {
            *status = next;
        }
        Some(*status)
    }

    pub fn view_status(&self, view: ViewKind) -> Option<ChannelStatus> {
        self.views.get(&view).copied()
    }

    /// O evento deve ser reencaminhado em bruto a esta conexão?
    pub fn wants(&self, event: &ChangeEvent) -> bool {
        self.topics
            .get(&event.table)
            .is_some_and(|c| c.status == ChannelStatus::Subscribed && c.events.contains(&event.event_type))
    }

    /// Vistas invalidadas por uma alteração nesta tabela.
    pub fn invalidated_views(&self, table: Table) -> Vec<ViewKind> {
        self.views
            .keys()
            .copied()
            .filter(|view| view.depends_on().contains(&table))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty() && self.views.is_empty()
    }

    /// Indicador de três estados derivado de todos os canais.
    pub fn indicator(&self) -> ConnectionIndicator {
        let statuses: Vec<ChannelStatus> = self
            .topics
            .values()
            .map(|c| c.status)
            .chain(self.views.values().copied())
            .filter(|s| *s != ChannelStatus::Closed)
            .collect();

        if statuses.is_empty() {
            ConnectionIndicator::Disconnected
        } else if statuses.iter().all(|s| *s == ChannelStatus::Subscribed) {
            ConnectionIndicator::Connected
        } else {
            ConnectionIndicator::Connecting
        }
    }

    /// Inatividade do cliente: todo o canal subscrito passa a `timed_out`.
    /// Devolve os nomes dos canais afetados.
    pub fn time_out_all(&mut self) -> Vec<String> {
        let mut names = Vec::new();
        for (table, channel) in self.topics.iter_mut() {
            if channel.status.can_transition_to(ChannelStatus::TimedOut) {
                channel.status = ChannelStatus::TimedOut;
                names.push(topic_channel_name(*table));
            }
        }
        for (view, status) in self.views.iter_mut() {
            if status.can_transition_to(ChannelStatus::TimedOut) {
                *status = ChannelStatus::TimedOut;
                names.push(view_channel_name(*view));
            }
        }
        names
    }

    /// Fecha todos os canais e devolve os seus nomes.
    pub fn close_all(&mut self) -> Vec<String> {
        let mut names: Vec<String> = self.topics.keys().map(|t| topic_channel_name(*t)).collect();
        names.extend(self.views.keys().map(|v| view_channel_name(*v)));
        self.topics.clear();
        self.views.clear();
        names
    }
}
