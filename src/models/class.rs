// src/models/class.rs
use crate::models::announcement::Announcement;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// --- Estruturas que espelham as Tabelas da DB ---

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Class {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

/// Professor atribuído a uma turma (id e nome sempre juntos).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeacherRef {
    pub id: String,
    pub name: String,
}

/// Linha de `class_teachers` já com o nome do professor.
#[derive(Debug, Clone, FromRow)]
pub struct ClassTeacherRow {
    pub class_id: String,
    pub user_id: String,
    pub name: String,
    pub position: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub class_id: String,
    pub name: String,
    pub birthday: Option<NaiveDate>,
    pub phone: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Visitor {
    pub id: String,
    pub class_id: String,
    pub name: String,
    pub visit_date: NaiveDate,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

/// Aniversário desnormalizado: mês e dia extraídos uma vez, na criação.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Birthday {
    pub id: String,
    pub class_id: String,
    pub student_id: Option<String>,
    pub name: String,
    pub birth_date: NaiveDate,
    pub month: i64,
    pub day: i64,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Inventory {
    /// `None` quando o registo foi sintetizado e ainda não foi gravado.
    pub id: Option<String>,
    pub class_id: String,
    pub quarter: String,
    pub bibles: i64,
    pub magazines: i64,
    pub offerings: f64,
    pub updated_at: Option<NaiveDateTime>,
}

impl Inventory {
    /// Inventário a zeros para uma turma que ainda não tem registo no trimestre.
    pub fn empty(class_id: &str, quarter: &str) -> Self {
        Self {
            id: None,
            class_id: class_id.to_string(),
            quarter: quarter.to_string(),
            bibles: 0,
            magazines: 0,
            offerings: 0.0,
            updated_at: None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

// --- Agregado ---

/// Turma com tudo o que lhe pertence, montado no momento da leitura.
#[derive(Debug, Clone, Serialize)]
pub struct ClassAggregate {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub teachers: Vec<TeacherRef>,
    pub students: Vec<Student>,
    pub visitors: Vec<Visitor>,
    pub announcements: Vec<Announcement>,
    pub birthdays: Vec<Birthday>,
    pub inventory: Inventory,
}

impl ClassAggregate {
    pub fn has_teacher(&self, user_id: &str) -> bool {
        self.teachers.iter().any(|t| t.id == user_id)
    }
}

// --- Payloads da API ---

#[derive(Debug, Deserialize)]
pub struct ClassPayload {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub teacher_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TeacherAssignment {
    pub teacher_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct StudentPayload {
    pub name: String,
    pub birthday: Option<NaiveDate>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StudentUpdate {
    pub name: String,
    pub birthday: Option<NaiveDate>,
    pub phone: Option<String>,
    /// Permite mudar o aluno de turma.
    pub class_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VisitorPayload {
    pub name: String,
    pub visit_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BirthdayPayload {
    pub class_id: String,
    pub name: String,
    pub birth_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct InventoryPayload {
    pub bibles: i64,
    pub magazines: i64,
    pub offerings: f64,
}
