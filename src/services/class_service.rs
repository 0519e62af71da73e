// src/services/class_service.rs
use crate::{
    calendar,
    error::{AppError, AppResult},
    models::{
        announcement::Announcement,
        class::{Birthday, Class, ClassAggregate, ClassTeacherRow, Inventory, Student, TeacherRef, Visitor},
        user::{Role, SessionUser},
    },
    services::{
        announcement_service, birthday_service, inventory_service, new_id, optional, required,
        student_service, user_service, visitor_service,
    },
};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::{HashMap, HashSet};

/// Que turmas um utilizador pode ver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassScope {
    All,
    Teacher(String),
}

impl ClassScope {
    pub fn for_user(user: &SessionUser) -> Self {
        match user.role {
            Role::Secretario => ClassScope::All,
            Role::Professor => ClassScope::Teacher(user.id.clone()),
        }
    }
}

pub async fn find_class(db_pool: &SqlitePool, class_id: &str) -> AppResult<Option<Class>> {
    let class = sqlx::query_as::<_, Class>("SELECT id, name, description, created_at FROM classes WHERE id = ?1")
        .bind(class_id)
        .fetch_optional(db_pool)
        .await?;
    Ok(class)
}

pub async fn list_class_rows(db_pool: &SqlitePool) -> AppResult<Vec<Class>> {
    let classes = sqlx::query_as::<_, Class>("SELECT id, name, description, created_at FROM classes ORDER BY name ASC")
        .fetch_all(db_pool)
        .await?;
    Ok(classes)
}

/// Professores de todas as turmas, pela ordem de atribuição.
async fn teacher_rows(db_pool: &SqlitePool) -> AppResult<Vec<ClassTeacherRow>> {
    let rows = sqlx::query_as::<_, ClassTeacherRow>(
        r#"
        SELECT ct.class_id, ct.user_id, u.name, ct.position
        FROM class_teachers ct
        JOIN users u ON u.id = ct.user_id
        ORDER BY ct.class_id, ct.position ASC
        "#,
    )
    .fetch_all(db_pool)
    .await?;
    Ok(rows)
}

pub async fn teachers_of(db_pool: &SqlitePool, class_id: &str) -> AppResult<Vec<TeacherRef>> {
    let teachers = sqlx::query_as::<_, TeacherRef>(
        r#"
        SELECT u.id, u.name
        FROM class_teachers ct
        JOIN users u ON u.id = ct.user_id
        WHERE ct.class_id = ?1
        ORDER BY ct.position ASC
        "#,
    )
    .bind(class_id)
    .fetch_all(db_pool)
    .await?;
    Ok(teachers)
}

/// Garante que o utilizador pode mexer nesta turma: a secretaria pode tudo,
/// um professor só as turmas onde leciona.
pub async fn ensure_class_access(db_pool: &SqlitePool, user: &SessionUser, class_id: &str) -> AppResult<Class> {
    let class = find_class(db_pool, class_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Turma".to_string()))?;

    if user.is_secretary() {
        return Ok(class);
    }
    let teaches = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM class_teachers WHERE class_id = ?1 AND user_id = ?2",
    )
    .bind(class_id)
    .bind(&user.id)
    .fetch_one(db_pool)
    .await?
        > 0;

    if teaches {
        Ok(class)
    } else {
        tracing::warn!("Professor '{}' sem acesso à turma {}", user.id, class_id);
        Err(AppError::Forbidden)
    }
}

/// Ids das turmas visíveis no âmbito dado.
pub async fn visible_class_ids(db_pool: &SqlitePool, scope: &ClassScope) -> AppResult<HashSet<String>> {
    let ids = match scope {
        ClassScope::All => sqlx::query_scalar::<_, String>("SELECT id FROM classes")
            .fetch_all(db_pool)
            .await?,
        ClassScope::Teacher(user_id) => user_service::class_ids_for(db_pool, user_id).await?,
    };
    Ok(ids.into_iter().collect())
}

fn group_by_class<T>(rows: Vec<T>, class_id: impl Fn(&T) -> &str) -> HashMap<String, Vec<T>> {
    let mut grouped: HashMap<String, Vec<T>> = HashMap::new();
    for row in rows {
        grouped.entry(class_id(&row).to_string()).or_default().push(row);
    }
    grouped
}

/// Junta cada turma com os seus professores, alunos, visitantes, avisos,
/// aniversários e o inventário do trimestre atual. Uma turma sem inventário
/// recebe um registo a zeros, que só é gravado quando alguém o salvar.
pub async fn get_classes(db_pool: &SqlitePool, scope: &ClassScope) -> AppResult<Vec<ClassAggregate>> {
    let quarter = calendar::current_quarter();
    tracing::debug!("Montando agregados das turmas ({:?}, {})", scope, quarter);

    let visible = visible_class_ids(db_pool, scope).await?;
    let classes: Vec<Class> = list_class_rows(db_pool)
        .await?
        .into_iter()
        .filter(|c| visible.contains(&c.id))
        .collect();
    if classes.is_empty() {
        return Ok(Vec::new());
    }

    let mut teachers: HashMap<String, Vec<TeacherRef>> = HashMap::new();
    for row in teacher_rows(db_pool).await? {
        teachers.entry(row.class_id).or_default().push(TeacherRef { id: row.user_id, name: row.name });
    }
    let mut students = group_by_class(student_service::list_all_students(db_pool).await?, |s: &Student| s.class_id.as_str());
    let mut visitors = group_by_class(visitor_service::list_all_visitors(db_pool).await?, |v: &Visitor| v.class_id.as_str());
    let mut announcements = group_by_class(
        announcement_service::list_all_announcements(db_pool).await?,
        |a: &Announcement| a.class_id.as_str(),
    );
    let mut birthdays =
        group_by_class(birthday_service::list_birthdays(db_pool, None).await?, |b: &Birthday| b.class_id.as_str());
    let mut inventories: HashMap<String, Inventory> = inventory_service::list_inventory_for_quarter(db_pool, &quarter)
        .await?
        .into_iter()
        .map(|inv| (inv.class_id.clone(), inv))
        .collect();

    let aggregates = classes
        .into_iter()
        .map(|class| {
            let inventory = inventories
                .remove(&class.id)
                .unwrap_or_else(|| Inventory::empty(&class.id, &quarter));
            ClassAggregate {
                teachers: teachers.remove(&class.id).unwrap_or_default(),
                students: students.remove(&class.id).unwrap_or_default(),
                visitors: visitors.remove(&class.id).unwrap_or_default(),
                announcements: announcements.remove(&class.id).unwrap_or_default(),
                birthdays: birthdays.remove(&class.id).unwrap_or_default(),
                inventory,
                id: class.id,
                name: class.name,
                description: class.description,
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!("{} turma(s) carregada(s).", aggregates.len());
    Ok(aggregates)
}

pub async fn get_class(db_pool: &SqlitePool, class_id: &str) -> AppResult<ClassAggregate> {
    get_classes(db_pool, &ClassScope::All)
        .await?
        .into_iter()
        .find(|c| c.id == class_id)
        .ok_or_else(|| AppError::NotFound("Turma".to_string()))
}

pub async fn create_class(
    db_pool: &SqlitePool,
    name: &str,
    description: Option<&str>,
    teacher_ids: &[String],
) -> AppResult<Class> {
    let name = required(name, "name")?;
    let description = optional(description);
    let ordered = checked_teacher_ids(db_pool, teacher_ids).await?;
    let id = new_id();

    // Turma e professores entram juntos ou não entram
    let mut tx = db_pool.begin().await?;
    sqlx::query("INSERT INTO classes (id, name, description) VALUES (?1, ?2, ?3)")
        .bind(&id)
        .bind(&name)
        .bind(&description)
        .execute(&mut *tx)
        .await?;
    insert_teachers(&mut tx, &id, &ordered).await?;
    tx.commit().await?;
    tracing::info!("✅ Turma '{}' criada ({}) com {} professor(es).", name, id, ordered.len());

    find_class(db_pool, &id).await?.ok_or(AppError::InternalServerError)
}

pub async fn update_class(
    db_pool: &SqlitePool,
    class_id: &str,
    name: &str,
    description: Option<&str>,
) -> AppResult<Class> {
    let name = required(name, "name")?;
    let description = optional(description);

    let rows_affected = sqlx::query("UPDATE classes SET name = ?1, description = ?2 WHERE id = ?3")
        .bind(&name)
        .bind(&description)
        .bind(class_id)
        .execute(db_pool)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        return Err(AppError::NotFound("Turma".to_string()));
    }
    find_class(db_pool, class_id).await?.ok_or(AppError::InternalServerError)
}

/// Apaga a turma; tudo o que lhe pertence cai em cascata. Devolve também os
/// ids dos avisos que caíram com ela.
pub async fn delete_class(db_pool: &SqlitePool, class_id: &str) -> AppResult<(Class, Vec<String>)> {
    let class = find_class(db_pool, class_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Turma".to_string()))?;

    let mut tx = db_pool.begin().await?;
    let announcement_ids = sqlx::query_scalar::<_, String>("SELECT id FROM announcements WHERE class_id = ?1")
        .bind(class_id)
        .fetch_all(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM classes WHERE id = ?1")
        .bind(class_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!("🗑️ Turma '{}' removida ({} aviso(s)).", class.name, announcement_ids.len());
    Ok((class, announcement_ids))
}

/// Ids sem repetições (fica a primeira posição), todos de professores existentes.
async fn checked_teacher_ids<'a>(db_pool: &SqlitePool, teacher_ids: &'a [String]) -> AppResult<Vec<&'a str>> {
    let mut seen = HashSet::new();
    let ordered: Vec<&str> = teacher_ids
        .iter()
        .map(String::as_str)
        .filter(|id| seen.insert(*id))
        .collect();

    for teacher_id in &ordered {
        match user_service::find_user_by_id(db_pool, teacher_id).await? {
            Some(user) if user.role == Role::Professor => {}
            Some(_) => {
                return Err(AppError::Validation(format!("'{}' não é professor.", teacher_id)));
            }
            None => return Err(AppError::NotFound(format!("Professor '{}'", teacher_id))),
        }
    }
    Ok(ordered)
}

async fn insert_teachers(
    tx: &mut Transaction<'_, Sqlite>,
    class_id: &str,
    ordered: &[&str],
) -> AppResult<()> {
    for (position, teacher_id) in ordered.iter().enumerate() {
        sqlx::query("INSERT INTO class_teachers (class_id, user_id, position) VALUES (?1, ?2, ?3)")
            .bind(class_id)
            .bind(*teacher_id)
            .bind(position as i64)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

/// Substitui a lista ordenada de professores da turma. Ids repetidos contam
/// uma vez, na primeira posição em que aparecem.
pub async fn set_class_teachers(
    db_pool: &SqlitePool,
    class_id: &str,
    teacher_ids: &[String],
) -> AppResult<Vec<TeacherRef>> {
    if find_class(db_pool, class_id).await?.is_none() {
        return Err(AppError::NotFound("Turma".to_string()));
    }
    let ordered = checked_teacher_ids(db_pool, teacher_ids).await?;

    let mut tx = db_pool.begin().await?;
    sqlx::query("DELETE FROM class_teachers WHERE class_id = ?1")
        .bind(class_id)
        .execute(&mut *tx)
        .await?;
    insert_teachers(&mut tx, class_id, &ordered).await?;
    tx.commit().await?;

    tracing::info!("Professores da turma {} atualizados: {} professor(es).", class_id, ordered.len());
    teachers_of(db_pool, class_id).await
}
