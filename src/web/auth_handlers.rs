// src/web/auth_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        realtime::{ChangeEvent, Table},
        user::{LoginForm, NewUser, SessionUser},
    },
    services::{auth_service, user_service},
    state::AppState,
    templates::LoginPage,
    web::mw_auth::SESSION_USER_KEY,
};
use askama::Template;
use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
    Json,
};
use serde::Deserialize;
use tower_cookies::{Cookie, Cookies};
use tower_sessions::Session;

/// Cookie assinado com o último utilizador que entrou neste navegador.
pub const LAST_USERNAME_COOKIE: &str = "ebd_last_username";

#[derive(Deserialize, Debug, Default)]
pub struct LoginFeedback {
    error: Option<String>,
    info: Option<String>,
}

fn render_login(error: Option<String>, info: Option<String>, username: String) -> AppResult<Html<String>> {
    let template = LoginPage { error, info, username };
    template.render().map(Html).map_err(|e| {
        tracing::error!("Falha ao renderizar template de login: {}", e);
        AppError::InternalServerError
    })
}

fn remembered_username(state: &AppState, cookies: &Cookies) -> String {
    cookies
        .signed(&state.cookie_key)
        .get(LAST_USERNAME_COOKIE)
        .map(|c| c.value().to_string())
        .unwrap_or_default()
}

/// Autentica a sessão: roda o id e guarda a identidade.
async fn start_session(session: &Session, user: &SessionUser) -> AppResult<()> {
    session
        .cycle_id()
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao rodar ID: {}", e)))?;
    session
        .insert(SESSION_USER_KEY, user)
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao inserir na sessão: {}", e)))?;
    Ok(())
}

fn remember_username(state: &AppState, cookies: &Cookies, username: &str) {
    let mut cookie = Cookie::new(LAST_USERNAME_COOKIE, username.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookies.signed(&state.cookie_key).add(cookie);
}

// GET /login
pub async fn show_login_form(
    State(state): State<AppState>,
    session: Session,
    cookies: Cookies,
    Query(feedback): Query<LoginFeedback>,
) -> AppResult<impl IntoResponse> {
    if session.get::<SessionUser>(SESSION_USER_KEY).await.ok().flatten().is_some() {
        tracing::debug!("GET /login: Utilizador já logado, redirecionando para /");
        return Ok(Redirect::to("/").into_response());
    }
    let username = remembered_username(&state, &cookies);
    Ok(render_login(feedback.error, feedback.info, username)?.into_response())
}

// POST /login
pub async fn handle_login(
    State(state): State<AppState>,
    session: Session,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> AppResult<impl IntoResponse> {
    tracing::info!("Tentativa de login ({}) para: {}", form.role.as_str(), form.username);

    match auth_service::authenticate(&state.db_pool, &form.username, &form.password, form.role).await {
        Ok(user) => {
            start_session(&session, &user).await?;
            remember_username(&state, &cookies, &user.username);
            tracing::info!("✅ Login bem-sucedido para: {} ({})", user.username, user.role.as_str());
            Ok(Redirect::to("/").into_response())
        }
        Err(AppError::InvalidCredentials) => {
            let page = render_login(
                Some("Utilizador ou senha inválidos.".to_string()),
                None,
                form.username.clone(),
            )?;
            Ok((StatusCode::UNAUTHORIZED, page).into_response())
        }
        Err(e) => {
            tracing::error!("Erro ao autenticar {}: {:?}", form.username, e);
            Err(e)
        }
    }
}

// POST /api/login (JSON, para clientes da API)
pub async fn handle_api_login(
    State(state): State<AppState>,
    session: Session,
    cookies: Cookies,
    Json(form): Json<LoginForm>,
) -> AppResult<Json<SessionUser>> {
    let user = auth_service::authenticate(&state.db_pool, &form.username, &form.password, form.role).await?;
    start_session(&session, &user).await?;
    remember_username(&state, &cookies, &user.username);
    tracing::info!("✅ Login (API) bem-sucedido para: {}", user.username);
    Ok(Json(user))
}

// POST /api/register: um professor cria a sua própria conta
pub async fn handle_register(
    State(state): State<AppState>,
    Json(new_user): Json<NewUser>,
) -> AppResult<impl IntoResponse> {
    let user = user_service::create_user(&state.db_pool, &new_user).await?;
    state.realtime.publish(ChangeEvent::insert(Table::Users, &user)).await;
    Ok((StatusCode::CREATED, Json(user)))
}

// GET /logout
pub async fn handle_logout(session: Session) -> AppResult<Redirect> {
    let user: Option<SessionUser> = session.get(SESSION_USER_KEY).await.ok().flatten();

    session
        .delete()
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao apagar sessão: {}", e)))?;

    match user {
        Some(u) => tracing::info!("🚪 Utilizador '{}' desligado.", u.username),
        None => tracing::info!("🚪 Sessão anónima desligada."),
    }

    Ok(Redirect::to(&format!(
        "/login?info={}",
        urlencoding::encode("Sessão terminada.")
    )))
}

// GET /api/me
pub async fn me(axum::Extension(user): axum::Extension<SessionUser>) -> Json<SessionUser> {
    Json(user)
}
