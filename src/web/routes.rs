// src/web/routes.rs
use crate::{
    state::AppState,
    web::{
        announcement_handlers, attendance_handlers, auth_handlers, class_handlers, message_handlers, mw_auth,
        mw_secretary, page_handlers, realtime_handlers, report_handlers, student_handlers, user_handlers,
    },
};
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

pub fn create_router(app_state: AppState) -> Router {
    // --- Rotas Públicas ---
    let public_routes = Router::new()
        .route("/login", get(auth_handlers::show_login_form).post(auth_handlers::handle_login))
        .route("/logout", get(auth_handlers::handle_logout))
        .route("/api/login", post(auth_handlers::handle_api_login))
        .route("/api/register", post(auth_handlers::handle_register));

    // --- Rotas da Secretaria ---
    // Exigem login E o papel de secretaria
    let secretary_routes = Router::new()
        .route("/users", get(user_handlers::list_users).post(user_handlers::create_user))
        .route("/users/{id}", delete(user_handlers::delete_user))
        .route("/users/{id}/password", put(user_handlers::reset_password))
        .route("/professors", get(user_handlers::list_professors))
        .route("/settings", get(user_handlers::get_settings).put(user_handlers::update_settings))
        .route("/classes/{id}/teachers", put(class_handlers::set_teachers))
        // Aplica APENAS require_secretary aqui (require_auth vem do router pai)
        .route_layer(middleware::from_fn(mw_secretary::require_secretary));

    // --- API para qualquer utilizador autenticado ---
    // Nos métodos reservados à secretaria o próprio handler verifica o papel
    let api_routes = Router::new()
        .route("/me", get(auth_handlers::me))
        .route("/classes", get(class_handlers::list_classes).post(class_handlers::create_class))
        .route(
            "/classes/{id}",
            get(class_handlers::get_class)
                .put(class_handlers::update_class)
                .delete(class_handlers::delete_class),
        )
        .route(
            "/classes/{id}/students",
            get(student_handlers::list_students).post(student_handlers::create_student),
        )
        .route(
            "/students/{id}",
            put(student_handlers::update_student).delete(student_handlers::delete_student),
        )
        .route(
            "/classes/{id}/visitors",
            get(student_handlers::list_visitors).post(student_handlers::create_visitor),
        )
        .route("/visitors/{id}", delete(student_handlers::delete_visitor))
        .route(
            "/classes/{id}/attendance",
            get(attendance_handlers::get_attendance).post(attendance_handlers::save_attendance),
        )
        .route(
            "/classes/{id}/inventory",
            get(class_handlers::get_inventory).put(class_handlers::save_inventory),
        )
        .route(
            "/birthdays",
            get(student_handlers::list_birthdays).post(student_handlers::create_birthday),
        )
        .route("/birthdays/{id}", delete(student_handlers::delete_birthday))
        .route(
            "/announcements",
            get(announcement_handlers::list_announcements).post(announcement_handlers::create_announcement),
        )
        .route("/announcements/{id}", delete(announcement_handlers::delete_announcement))
        .route(
            "/announcements/{id}/replies",
            get(announcement_handlers::list_replies).post(announcement_handlers::add_reply),
        )
        .route("/messages", get(message_handlers::list_messages).post(message_handlers::send_message))
        .route("/reports/dashboard", get(report_handlers::dashboard))
        .route("/reports/classes/{id}", get(report_handlers::class_report))
        .route("/calendar", get(report_handlers::calendar_month))
        .merge(secretary_routes);

    // --- Rotas Autenticadas (Combinando tudo) ---
    let authenticated_routes = Router::new()
        .route("/", get(page_handlers::home_page_handler))
        .route("/ws", get(realtime_handlers::realtime_websocket_handler))
        .nest("/api", api_routes)
        // Aplica o middleware geral require_auth a TODAS as rotas acima
        .route_layer(middleware::from_fn_with_state(app_state.clone(), mw_auth::require_auth));

    // --- Router Final ---
    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .with_state(app_state)
}
