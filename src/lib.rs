// src/lib.rs

// --- Declaração dos Módulos ---
pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod realtime;
pub mod services;
pub mod state;
pub mod templates;
pub mod web;
