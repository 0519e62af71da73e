mod common;

use chrono::NaiveDate;
use common::*;
use ebd_gestao::{
    calendar,
    error::AppError,
    models::{
        announcement::{AnnouncementPayload, AnnouncementTarget},
        attendance::AttendanceMark,
        class::{InventoryPayload, StudentPayload},
        message::MessagePayload,
        user::Role,
    },
    services::{
        announcement_service, attendance_service, auth_service, class_service, inventory_service,
        message_service, report_service, settings_service, student_service, user_service,
    },
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("data válida")
}

#[tokio::test]
async fn class_without_inventory_gets_a_zero_row_for_the_current_quarter() {
    let pool = test_pool().await;
    let class = class_named(&pool, "Juniores", &[]).await;

    let classes = class_service::get_classes(&pool, &class_service::ClassScope::All).await.unwrap();
    assert_eq!(classes.len(), 1);
    let inventory = &classes[0].inventory;
    assert!(!inventory.is_persisted());
    assert_eq!(inventory.quarter, calendar::current_quarter());
    assert_eq!((inventory.bibles, inventory.magazines, inventory.offerings), (0, 0, 0.0));

    // Nada foi gravado só por ler
    assert!(inventory_service::find_inventory(&pool, &class.id, &calendar::current_quarter())
        .await
        .unwrap()
        .is_none());

    let saved = inventory_service::save_inventory(
        &pool,
        &class.id,
        &InventoryPayload { bibles: 12, magazines: 8, offerings: 45.5 },
    )
    .await
    .unwrap();
    assert!(saved.is_persisted());

    let classes = class_service::get_classes(&pool, &class_service::ClassScope::All).await.unwrap();
    assert_eq!(classes[0].inventory.bibles, 12);
    assert_eq!(classes[0].inventory.offerings, 45.5);
}

#[tokio::test]
async fn last_inventory_save_wins() {
    let pool = test_pool().await;
    let class = class_named(&pool, "Adolescentes", &[]).await;

    for bibles in [3, 9] {
        inventory_service::save_inventory(&pool, &class.id, &InventoryPayload { bibles, magazines: 1, offerings: 0.0 })
            .await
            .unwrap();
    }
    let all = inventory_service::list_inventory_for_quarter(&pool, &calendar::current_quarter()).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].bibles, 9);
}

#[tokio::test]
async fn negative_inventory_is_rejected() {
    let pool = test_pool().await;
    let class = class_named(&pool, "Jovens", &[]).await;
    let err = inventory_service::save_inventory(
        &pool,
        &class.id,
        &InventoryPayload { bibles: -1, magazines: 0, offerings: 0.0 },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn saving_the_same_day_twice_replaces_the_marks() {
    let pool = test_pool().await;
    let class = class_named(&pool, "Kids B", &[]).await;
    let ids = enroll(&pool, &class.id, &["Ana", "Bruno"]).await;
    let day = date(2024, 5, 5);

    let marks = vec![
        AttendanceMark { student_id: ids[0].clone(), present: true },
        AttendanceMark { student_id: ids[1].clone(), present: false },
    ];
    attendance_service::save_attendance_day(&pool, &class.id, day, &marks).await.unwrap();
    let again = vec![AttendanceMark { student_id: ids[0].clone(), present: false }];
    attendance_service::save_attendance_day(&pool, &class.id, day, &again).await.unwrap();

    let sheet = attendance_service::get_attendance_day(&pool, &class.id, day).await.unwrap();
    assert_eq!(sheet.week, 6);
    assert_eq!(sheet.quarter, "2024-Q2");
    for entry in &sheet.entries {
        assert_eq!(entry.present, Some(false), "{}", entry.student_name);
    }

    let records = attendance_service::list_attendance_for_class(&pool, &class.id, "2024-Q2").await.unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn attendance_for_a_student_of_another_class_is_rejected() {
    let pool = test_pool().await;
    let a = class_named(&pool, "A", &[]).await;
    let b = class_named(&pool, "B", &[]).await;
    let outsider = enroll(&pool, &b.id, &["Carla"]).await;

    let err = attendance_service::save_attendance_day(
        &pool,
        &a.id,
        date(2024, 5, 5),
        &[AttendanceMark { student_id: outsider[0].clone(), present: true }],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn deleting_a_teacher_keeps_the_order_of_the_others() {
    let pool = test_pool().await;
    let a = professor(&pool, "ana").await;
    let b = professor(&pool, "bia").await;
    let c = professor(&pool, "caio").await;
    let class = class_named(&pool, "Casais", &[c.id.clone(), a.id.clone(), b.id.clone()]).await;

    let affected = user_service::delete_user(&pool, &a.id).await.unwrap();
    assert_eq!(affected, vec![class.id.clone()]);

    let teachers = class_service::teachers_of(&pool, &class.id).await.unwrap();
    let ids: Vec<&str> = teachers.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec![c.id.as_str(), b.id.as_str()]);

    let users = user_service::find_all_users(&pool).await.unwrap();
    assert!(users.iter().all(|u| u.id != a.id));
    let bia = users.iter().find(|u| u.id == b.id).unwrap();
    assert_eq!(bia.class_ids, vec![class.id.clone()]);
}

#[tokio::test]
async fn teacher_list_ignores_duplicates_and_rejects_unknown_ids() {
    let pool = test_pool().await;
    let a = professor(&pool, "ana").await;
    let class = class_named(&pool, "Senhores", &[]).await;

    let teachers = class_service::set_class_teachers(&pool, &class.id, &[a.id.clone(), a.id.clone()])
        .await
        .unwrap();
    assert_eq!(teachers.len(), 1);

    let err = class_service::set_class_teachers(&pool, &class.id, &["fantasma".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn class_with_an_unknown_teacher_is_not_created() {
    let pool = test_pool().await;
    let a = professor(&pool, "ana").await;

    let err = class_service::create_class(&pool, "Órfã", None, &[a.id.clone(), "nao-existe".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(class_service::list_class_rows(&pool).await.unwrap().is_empty());
    assert!(user_service::class_ids_for(&pool, &a.id).await.unwrap().is_empty());

    let class = class_service::create_class(&pool, "Órfã", None, &[a.id.clone()]).await.unwrap();
    let teachers = class_service::teachers_of(&pool, &class.id).await.unwrap();
    assert_eq!(teachers.len(), 1);
    assert_eq!(teachers[0].id, a.id);
}

#[tokio::test]
async fn teachers_only_see_their_classes() {
    let pool = test_pool().await;
    let a = professor(&pool, "ana").await;
    let mine = class_named(&pool, "Minha", &[a.id.clone()]).await;
    let other = class_named(&pool, "Outra", &[]).await;
    let session = as_session(&a);

    let visible = class_service::get_classes(&pool, &class_service::ClassScope::for_user(&session))
        .await
        .unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, mine.id);

    assert!(class_service::ensure_class_access(&pool, &session, &mine.id).await.is_ok());
    let err = class_service::ensure_class_access(&pool, &session, &other.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
}

#[tokio::test]
async fn broadcast_creates_one_announcement_per_class() {
    let pool = test_pool().await;
    for name in ["Kids A", "Kids B", "Jovens"] {
        class_named(&pool, name, &[]).await;
    }
    let sec = secretary(&pool).await;

    let created = announcement_service::create_announcement(
        &pool,
        &sec,
        &AnnouncementPayload { title: "Festa".into(), content: "Domingo".into(), target: AnnouncementTarget::All },
    )
    .await
    .unwrap();
    assert_eq!(created.len(), 3);
    let mut class_ids: Vec<&str> = created.iter().map(|a| a.class_id.as_str()).collect();
    class_ids.sort();
    class_ids.dedup();
    assert_eq!(class_ids.len(), 3);

    let prof = professor(&pool, "ana").await;
    let err = announcement_service::create_announcement(
        &pool,
        &as_session(&prof),
        &AnnouncementPayload { title: "x".into(), content: "y".into(), target: AnnouncementTarget::All },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
}

#[tokio::test]
async fn student_with_birthday_gets_a_mirrored_birthday() {
    let pool = test_pool().await;
    let class = class_named(&pool, "Kids A", &[]).await;

    let (student, birthday) = student_service::create_student(
        &pool,
        &class.id,
        &StudentPayload { name: "Davi".into(), birthday: Some(date(2016, 3, 14)), phone: None },
    )
    .await
    .unwrap();
    let birthday = birthday.expect("aniversário espelhado");
    assert_eq!(birthday.student_id.as_deref(), Some(student.id.as_str()));
    assert_eq!((birthday.month, birthday.day), (3, 14));
}

#[tokio::test]
async fn kids_a_quarter_report() {
    let pool = test_pool().await;
    let class = class_named(&pool, "Kids A", &[]).await;
    let names = ["A1", "A2", "A3", "A4", "A5", "A6", "A7", "A8", "A9", "A10"];
    let ids = enroll(&pool, &class.id, &names).await;

    let marks: Vec<AttendanceMark> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| AttendanceMark { student_id: id.clone(), present: i < 7 })
        .collect();
    attendance_service::save_attendance_day(&pool, &class.id, date(2024, 5, 5), &marks).await.unwrap();

    let report = report_service::class_report(&pool, &class.id, "2024-Q2").await.unwrap();
    assert_eq!(report.students, 10);
    assert_eq!(report.present, 7);
    assert_eq!(report.absent, 3);
    assert_eq!(report.attendance_rate, 5);
    assert_eq!(report.weekly_present[5], 7);

    let dashboard = report_service::dashboard(&pool, &class_service::ClassScope::All, "2024-Q2").await.unwrap();
    assert_eq!(dashboard.quarter_present, 7);
    assert_eq!(dashboard.classes[0].attendance_rate, 5);

    let err = report_service::dashboard(&pool, &class_service::ClassScope::All, "2024-Q5").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn secretary_and_teacher_authentication() {
    let pool = test_pool().await;
    let prof = professor(&pool, "ana").await;

    let sec = auth_service::authenticate(&pool, SECRETARY_USERNAME, SECRETARY_PASSWORD, Role::Secretario)
        .await
        .unwrap();
    assert!(sec.is_secretary());

    let teacher = auth_service::authenticate(&pool, "ANA", "senha123", Role::Professor).await.unwrap();
    assert_eq!(teacher.id, prof.id);

    for (user, pass, role) in [
        ("ana", "errada", Role::Professor),
        ("ana", "senha123", Role::Secretario),
        (SECRETARY_USERNAME, SECRETARY_PASSWORD, Role::Professor),
    ] {
        let err = auth_service::authenticate(&pool, user, pass, role).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials), "{} {:?}", user, role);
    }
}

#[tokio::test]
async fn duplicate_username_is_a_conflict() {
    let pool = test_pool().await;
    professor(&pool, "ana").await;
    let err = user_service::create_user(
        &pool,
        &ebd_gestao::models::user::NewUser { username: "Ana".into(), name: "Outra".into(), password: "senha123".into() },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn legacy_secretary_id_is_migrated_with_its_messages() {
    let pool = test_pool().await;
    sqlx::query("UPDATE system_settings SET secretary_id = ?1 WHERE id = 1")
        .bind(settings_service::LEGACY_SECRETARY_ID)
        .execute(&pool)
        .await
        .unwrap();
    let prof = professor(&pool, "ana").await;
    let legacy = secretary(&pool).await;
    assert_eq!(legacy.id, settings_service::LEGACY_SECRETARY_ID);

    let sent = message_service::send_message(
        &pool,
        &legacy,
        &MessagePayload { content: "Bem-vinda".into(), recipient_id: Some(prof.id.clone()), broadcast: false },
    )
    .await
    .unwrap();

    let fresh = settings_service::migrate_legacy_secretary_id(&pool).await.unwrap().expect("migrado");
    assert_ne!(fresh, settings_service::LEGACY_SECRETARY_ID);
    assert_eq!(settings_service::get_settings(&pool).await.unwrap().secretary_id, fresh);

    let message = message_service::find_message(&pool, &sent.id).await.unwrap().unwrap();
    assert_eq!(message.sender_id, fresh);

    assert!(settings_service::migrate_legacy_secretary_id(&pool).await.unwrap().is_none());
}

#[tokio::test]
async fn messages_are_only_listed_to_participants() {
    let pool = test_pool().await;
    let a = professor(&pool, "ana").await;
    let b = professor(&pool, "bia").await;
    let sec = secretary(&pool).await;

    message_service::send_message(
        &pool,
        &as_session(&a),
        &MessagePayload { content: "Dúvida".into(), recipient_id: None, broadcast: false },
    )
    .await
    .unwrap();
    message_service::send_message(
        &pool,
        &sec,
        &MessagePayload { content: "Aviso geral".into(), recipient_id: None, broadcast: true },
    )
    .await
    .unwrap();

    assert_eq!(message_service::list_messages_for(&pool, &sec).await.unwrap().len(), 2);
    assert_eq!(message_service::list_messages_for(&pool, &as_session(&a)).await.unwrap().len(), 2);
    assert_eq!(message_service::list_messages_for(&pool, &as_session(&b)).await.unwrap().len(), 1);

    let err = message_service::send_message(
        &pool,
        &as_session(&b),
        &MessagePayload { content: "Para todos".into(), recipient_id: None, broadcast: true },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
}
