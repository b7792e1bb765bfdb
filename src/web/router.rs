use axum::{
    Router,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};

use crate::web::{AppState, api, auth, employer, landing, portal};

const ROBOTS_TXT_BODY: &str = include_str!("../../robots.txt");

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(landing::landing_page))
        .route("/healthz", get(healthz))
        .route("/robots.txt", get(robots_txt))
        // authentication
        .route("/hr/login", get(auth::hr_login_page).post(auth::hr_login))
        .route("/login", get(auth::applicant_login_page).post(auth::applicant_login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        // recruiter pages
        .route("/overview", get(employer::overview))
        .route("/employer", get(employer::employer_portal))
        .route("/position/add", post(employer::add_position))
        .route("/position/:position_id/edit", post(employer::edit_position))
        .route("/position/:position_id/delete", post(employer::delete_position))
        .route("/analyze", get(employer::analyze_page))
        .route("/analyze/:position_id", get(employer::analyze_page_for_position))
        .route("/process_analysis", post(employer::process_analysis))
        .route("/dashboard", get(employer::dashboard))
        .route("/dashboard/:position_id", get(employer::dashboard_for_position))
        .route("/candidate/:candidate_id", get(employer::candidate_detail))
        .route("/update_status/:candidate_id", post(employer::update_status))
        .route("/delete_candidate/:candidate_id", post(employer::delete_candidate))
        // applicant pages
        .route("/portal", get(portal::applicant_portal))
        .route("/apply/:position_id", post(portal::apply))
        .route(
            "/application_status",
            get(portal::application_status_page).post(portal::application_status_lookup),
        )
        .route("/my-applications", get(portal::applicant_dashboard))
        // programmatic access
        .route("/api/analyze", post(api::analyze))
        .with_state(state)
}

async fn robots_txt() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        ROBOTS_TXT_BODY,
    )
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}
