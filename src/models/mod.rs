// src/models/mod.rs
pub mod announcement;
pub mod attendance;
pub mod class;
pub mod message;
pub mod realtime;
pub mod report;
pub mod user;
