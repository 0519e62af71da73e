// src/models/realtime.rs
//! Mensagens trocadas no websocket de tempo real.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};

/// Coleções que emitem eventos de alteração.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Users,
    Classes,
    ClassTeachers,
    Students,
    Visitors,
    Announcements,
    Birthdays,
    Inventory,
    AttendanceRecords,
    SystemSettings,
    Messages,
}

impl Table {
    pub const ALL: [Table; 11] = [
        Table::Users,
        Table::Classes,
        Table::ClassTeachers,
        Table::Students,
        Table::Visitors,
        Table::Announcements,
        Table::Birthdays,
        Table::Inventory,
        Table::AttendanceRecords,
        Table::SystemSettings,
        Table::Messages,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Classes => "classes",
            Table::ClassTeachers => "class_teachers",
            Table::Students => "students",
            Table::Visitors => "visitors",
            Table::Announcements => "announcements",
            Table::Birthdays => "birthdays",
            Table::Inventory => "inventory",
            Table::AttendanceRecords => "attendance_records",
            Table::SystemSettings => "system_settings",
            Table::Messages => "messages",
        }
    }
}

impl Table {
    /// Linhas desta coleção pertencem a uma turma.
    pub fn is_class_scoped(&self) -> bool {
        matches!(
            self,
            Table::Classes
                | Table::ClassTeachers
                | Table::Students
                | Table::Visitors
                | Table::Announcements
                | Table::Birthdays
                | Table::Inventory
                | Table::AttendanceRecords
        )
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("coleção desconhecida: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Insert,
    Update,
    Delete,
}

/// Alteração numa linha, publicada depois de cada escrita bem-sucedida.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub event_type: EventType,
    pub new: Option<Value>,
    pub old: Option<Value>,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(table: Table, event_type: EventType, new: Option<Value>, old: Option<Value>) -> Self {
        Self { table, event_type, new, old, at: Utc::now() }
    }

    pub fn insert<T: Serialize>(table: Table, row: &T) -> Self {
        Self::new(table, EventType::Insert, to_value(row), None)
    }

    pub fn update<T: Serialize>(table: Table, row: &T) -> Self {
        Self::new(table, EventType::Update, to_value(row), None)
    }

    /// Remoção; só o id da linha antiga é conhecido.
    pub fn delete(table: Table, id: &str) -> Self {
        Self::new(table, EventType::Delete, None, Some(serde_json::json!({ "id": id })))
    }

    /// Remoção de uma linha que pertence a uma turma.
    pub fn delete_in_class(table: Table, id: &str, class_id: &str) -> Self {
        Self::new(
            table,
            EventType::Delete,
            None,
            Some(serde_json::json!({ "id": id, "class_id": class_id })),
        )
    }

    /// Turma a que a linha pertence, se a coleção for por turma.
    pub fn class_id(&self) -> Option<&str> {
        let field = match self.table {
            Table::Classes => "id",
            t if t.is_class_scoped() => "class_id",
            _ => return None,
        };
        self.new
            .as_ref()
            .and_then(|row| row.get(field))
            .or_else(|| self.old.as_ref().and_then(|row| row.get(field)))
            .and_then(Value::as_str)
    }
}

fn to_value<T: Serialize>(row: &T) -> Option<Value> {
    serde_json::to_value(row)
        .map_err(|e| tracing::warn!("Falha ao serializar linha para evento: {}", e))
        .ok()
}

/// Vistas agregadas que o servidor mantém atualizadas por conexão.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Classes,
    Messages,
    Users,
}

impl ViewKind {
    /// Coleções cujas alterações invalidam a vista.
    pub fn depends_on(&self) -> &'static [Table] {
        match self {
            ViewKind::Classes => &[
                Table::Classes,
                Table::ClassTeachers,
                Table::Users,
                Table::Students,
                Table::Visitors,
                Table::Announcements,
                Table::Birthdays,
                Table::Inventory,
            ],
            ViewKind::Messages => &[Table::Messages],
            ViewKind::Users => &[Table::Users, Table::ClassTeachers],
        }
    }
}

/// Estado de um canal lógico.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    Connecting,
    Subscribed,
    Error,
    TimedOut,
    Closed,
}

/// Indicador grosseiro mostrado ao utilizador.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionIndicator {
    Connecting,
    Connected,
    Disconnected,
}

/// Ação enviada pelo cliente.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    Subscribe {
        topic: Table,
        /// Vazio = todos os tipos de evento.
        #[serde(default)]
        events: Vec<EventType>,
    },
    Unsubscribe {
        topic: Table,
    },
    Watch {
        view: ViewKind,
    },
    Unwatch {
        view: ViewKind,
    },
    Ping,
}

/// Mensagem enviada pelo servidor.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Status {
        channel: String,
        status: ChannelStatus,
        connection: ConnectionIndicator,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    Change(ChangeEvent),
    Snapshot {
        view: ViewKind,
        data: Value,
    },
    Pong,
}
