// src/models/message.rs
use crate::models::user::Role;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Recado do chat entre professores e a secretaria.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_role: Role,
    /// `None` quando o destinatário é a secretaria (o papel, não uma conta).
    pub recipient_id: Option<String>,
    pub is_broadcast: bool,
    pub content: String,
    pub created_at: Option<NaiveDateTime>,
}

impl Message {
    /// O utilizador participa neste recado (ou é um recado para todos)?
    pub fn is_visible_to(&self, user_id: &str, role: Role) -> bool {
        if self.is_broadcast {
            return true;
        }
        match role {
            Role::Secretario => self.sender_role == Role::Secretario || self.recipient_id.is_none(),
            Role::Professor => {
                self.sender_id == user_id || self.recipient_id.as_deref() == Some(user_id)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MessagePayload {
    pub content: String,
    pub recipient_id: Option<String>,
    #[serde(default)]
    pub broadcast: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(sender: &str, role: Role, recipient: Option<&str>, broadcast: bool) -> Message {
        Message {
            id: "m".into(),
            sender_id: sender.into(),
            sender_name: sender.into(),
            sender_role: role,
            recipient_id: recipient.map(String::from),
            is_broadcast: broadcast,
            content: "olá".into(),
            created_at: None,
        }
    }

    #[test]
    fn teacher_sees_own_threads_and_broadcasts() {
        let to_secretary = msg("prof-a", Role::Professor, None, false);
        let to_a = msg("sec", Role::Secretario, Some("prof-a"), false);
        let to_b = msg("sec", Role::Secretario, Some("prof-b"), false);
        let everyone = msg("sec", Role::Secretario, None, true);

        assert!(to_secretary.is_visible_to("prof-a", Role::Professor));
        assert!(to_a.is_visible_to("prof-a", Role::Professor));
        assert!(!to_b.is_visible_to("prof-a", Role::Professor));
        assert!(everyone.is_visible_to("prof-a", Role::Professor));
        assert!(!to_secretary.is_visible_to("prof-b", Role::Professor));
    }

    #[test]
    fn secretary_role_sees_every_conversation_it_is_part_of() {
        let from_teacher = msg("prof-a", Role::Professor, None, false);
        let reply = msg("sec-1", Role::Secretario, Some("prof-a"), false);
        assert!(from_teacher.is_visible_to("sec-2", Role::Secretario));
        assert!(reply.is_visible_to("sec-2", Role::Secretario));
    }
}
