// src/templates.rs
use askama::Template;

// Struct para o template `login.html`
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub error: Option<String>,
    pub info: Option<String>,
    /// Último utilizador que entrou neste navegador (cookie assinado).
    pub username: String,
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomePage {
    pub church_name: String,
    pub user_name: String,
    pub role_label: &'static str,
    pub is_secretary: bool,
}
