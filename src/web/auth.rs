use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, Redirect},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use cookie::time::Duration as CookieDuration;
use rand_core::OsRng;
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::web::{
    AppState,
    state::Session,
    templates::{escape_html, render_form_page},
};

pub const SESSION_COOKIE: &str = "session_token";
pub const SESSION_TTL_DAYS: i64 = 7;

/// Fixed recruiter credentials. There is no HR account management; the
/// single operator login is part of the product's current shape.
const HR_USERNAME: &str = "hr_admin";
const HR_PASSWORD: &str = "admin123";

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
}

// ----- session helpers -----

pub async fn current_session(state: &AppState, jar: &CookieJar) -> Option<Session> {
    let cookie = jar.get(SESSION_COOKIE)?;
    let token = Uuid::parse_str(cookie.value()).ok()?;
    state.session(token).await
}

/// Gate for recruiter-only pages.
pub async fn require_hr(state: &AppState, jar: &CookieJar) -> Result<Session, Redirect> {
    match current_session(state, jar).await {
        Some(session) if session.is_hr => Ok(session),
        _ => Err(Redirect::to("/hr/login")),
    }
}

/// Gate for applicant-only pages; yields the account id alongside the
/// session.
pub async fn require_applicant(state: &AppState, jar: &CookieJar) -> Result<(Session, Uuid), Redirect> {
    match current_session(state, jar).await {
        Some(session) => match session.user_id {
            Some(user_id) => Ok((session, user_id)),
            None => Err(Redirect::to("/login")),
        },
        None => Err(Redirect::to("/login")),
    }
}

fn session_cookie(token: Uuid) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(CookieDuration::days(SESSION_TTL_DAYS));
    cookie
}

// ----- HR login -----

pub async fn hr_login_page(State(state): State<AppState>, jar: CookieJar) -> Result<Html<String>, Redirect> {
    if let Some(session) = current_session(&state, &jar).await {
        if session.is_hr {
            return Err(Redirect::to("/overview"));
        }
    }
    Ok(Html(render_hr_login_page(None)))
}

pub async fn hr_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Redirect), (StatusCode, Html<String>)> {
    if form.username.trim() != HR_USERNAME || form.password != HR_PASSWORD {
        return Err((
            StatusCode::UNAUTHORIZED,
            Html(render_hr_login_page(Some("Invalid username or password."))),
        ));
    }

    let token = state
        .create_session(None, Some("HR Manager".to_string()), true)
        .await;
    info!("HR operator logged in");
    Ok((jar.add(session_cookie(token)), Redirect::to("/overview")))
}

// ----- applicant registration and login -----

pub async fn register_page(State(state): State<AppState>, jar: CookieJar) -> Result<Html<String>, Redirect> {
    if current_session(&state, &jar).await.is_some_and(|s| s.user_id.is_some()) {
        return Err(Redirect::to("/my-applications"));
    }
    Ok(Html(render_register_page(None)))
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<(CookieJar, Redirect), (StatusCode, Html<String>)> {
    let username = form.username.trim();
    let name = form.name.trim();
    let email = form.email.trim();

    if username.is_empty() || form.password.is_empty() || name.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Html(render_register_page(Some("All fields are required."))),
        ));
    }

    let password_hash = match hash_password(&form.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!(%err, "failed to hash password during registration");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_register_page(Some("Something went wrong. Please try again."))),
            ));
        }
    };

    let user = match state
        .store()
        .create_user(username, &password_hash, name, email)
        .await
    {
        Ok(Some(user)) => user,
        Ok(None) => {
            return Err((
                StatusCode::CONFLICT,
                Html(render_register_page(Some("That username is already taken."))),
            ));
        }
        Err(err) => {
            error!(?err, "failed to persist new account");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_register_page(Some("Something went wrong. Please try again."))),
            ));
        }
    };

    let token = state
        .create_session(Some(user.id), Some(user.name.clone()), false)
        .await;
    info!(username = %user.username, "new applicant registered");
    Ok((jar.add(session_cookie(token)), Redirect::to("/portal")))
}

pub async fn applicant_login_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Html<String>, Redirect> {
    if current_session(&state, &jar).await.is_some_and(|s| s.user_id.is_some()) {
        return Err(Redirect::to("/my-applications"));
    }
    Ok(Html(render_applicant_login_page(None)))
}

pub async fn applicant_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Redirect), (StatusCode, Html<String>)> {
    let username = form.username.trim();

    let user = match state.store().user_by_username(username).await {
        Some(user) => user,
        None => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Html(render_applicant_login_page(Some("Invalid username or password."))),
            ));
        }
    };

    if !verify_password(&form.password, &user.password_hash) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Html(render_applicant_login_page(Some("Invalid username or password."))),
        ));
    }

    let token = state
        .create_session(Some(user.id), Some(user.name.clone()), false)
        .await;
    Ok((jar.add(session_cookie(token)), Redirect::to("/portal")))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let mut jar = jar;

    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Ok(token) = Uuid::parse_str(cookie.value()) {
            state.remove_session(token).await;
        }
    }

    let mut removal = Cookie::new(SESSION_COOKIE, "");
    removal.set_path("/");
    removal.set_http_only(true);
    removal.set_same_site(SameSite::Lax);
    removal.set_max_age(CookieDuration::seconds(0));
    jar = jar.remove(removal);

    (jar, Redirect::to("/"))
}

// ----- password hashing -----

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed = PasswordHash::new(password_hash);
    match parsed {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

// ----- page rendering -----

fn error_banner(error: Option<&str>) -> String {
    match error {
        Some(message) => format!(
            r#"<p class="message error">{}</p>"#,
            escape_html(message)
        ),
        None => String::new(),
    }
}

fn render_hr_login_page(error: Option<&str>) -> String {
    let panel = format!(
        r#"            <h1>Recruiter Sign-In</h1>
            <p class="description">Access the candidate screening dashboard.</p>
            {banner}
            <form method="post" action="/hr/login">
                <label for="username">Username</label>
                <input id="username" name="username" required>
                <label for="password">Password</label>
                <input id="password" type="password" name="password" required>
                <button type="submit">Sign in</button>
            </form>
            <p class="alt-link"><a href="/">Back to home</a></p>"#,
        banner = error_banner(error),
    );
    render_form_page("Recruiter Sign-In · TalentScreen", &panel)
}

fn render_applicant_login_page(error: Option<&str>) -> String {
    let panel = format!(
        r#"            <h1>Applicant Sign-In</h1>
            <p class="description">Sign in to apply for open positions and track your applications.</p>
            {banner}
            <form method="post" action="/login">
                <label for="username">Username</label>
                <input id="username" name="username" required>
                <label for="password">Password</label>
                <input id="password" type="password" name="password" required>
                <button type="submit">Sign in</button>
            </form>
            <p class="alt-link">No account yet? <a href="/register">Register</a></p>"#,
        banner = error_banner(error),
    );
    render_form_page("Applicant Sign-In · TalentScreen", &panel)
}

fn render_register_page(error: Option<&str>) -> String {
    let panel = format!(
        r#"            <h1>Create Account</h1>
            <p class="description">Register to apply for open positions.</p>
            {banner}
            <form method="post" action="/register">
                <label for="name">Full name</label>
                <input id="name" name="name" required>
                <label for="email">Email</label>
                <input id="email" type="email" name="email" required>
                <label for="username">Username</label>
                <input id="username" name="username" required>
                <label for="password">Password</label>
                <input id="password" type="password" name="password" required>
                <button type="submit">Register</button>
            </form>
            <p class="alt-link">Already registered? <a href="/login">Sign in</a></p>"#,
        banner = error_banner(error),
    );
    render_form_page("Register · TalentScreen", &panel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_and_rejects() {
        let hash = hash_password("s3cret").unwrap();
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn login_pages_carry_error_banner() {
        let html = render_applicant_login_page(Some("Invalid username or password."));
        assert!(html.contains("message error"));
        assert!(html.contains("Invalid username or password."));
        assert!(!render_applicant_login_page(None).contains("message error"));
    }
}
