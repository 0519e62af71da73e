// src/web/mod.rs
pub mod announcement_handlers;
pub mod attendance_handlers;
pub mod auth_handlers;
pub mod class_handlers;
pub mod message_handlers;
pub mod mw_auth;
pub mod mw_secretary;
pub mod page_handlers;
pub mod realtime_handlers;
pub mod report_handlers;
pub mod routes;
pub mod student_handlers;
pub mod user_handlers;
