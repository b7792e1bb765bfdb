use axum::{
    extract::{Form, Multipart, Path, State},
    response::{Html, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    scoring,
    web::{
        AppState,
        auth::{current_session, require_applicant},
        employer::extract_upload_text,
        templates::{NavLink, PageLayout, escape_html, render_page, status_tag},
        uploads,
    },
};

fn applicant_nav(logged_in: bool) -> Vec<NavLink<'static>> {
    let mut links = vec![
        NavLink {
            href: "/",
            label: "Home",
        },
        NavLink {
            href: "/portal",
            label: "Open Positions",
        },
        NavLink {
            href: "/application_status",
            label: "Check Status",
        },
    ];
    if logged_in {
        links.push(NavLink {
            href: "/my-applications",
            label: "My Applications",
        });
    } else {
        links.push(NavLink {
            href: "/login",
            label: "Sign in",
        });
    }
    links
}

fn applicant_page(meta_title: &str, heading: &str, logged_in: bool, body_html: String) -> Html<String> {
    Html(render_page(PageLayout {
        meta_title,
        page_heading: heading,
        nav_links: applicant_nav(logged_in),
        body_html: body_html.into(),
        extra_style_blocks: Vec::new(),
    }))
}

fn flash_banner(message: Option<&str>, is_error: bool) -> String {
    match message {
        Some(message) => {
            let class = if is_error { "error" } else { "success" };
            format!(
                r#"<p class="message {class}">{}</p>"#,
                escape_html(message)
            )
        }
        None => String::new(),
    }
}

// ----- job listing -----

pub async fn applicant_portal(State(state): State<AppState>, jar: CookieJar) -> Html<String> {
    let logged_in = current_session(&state, &jar)
        .await
        .is_some_and(|s| s.user_id.is_some());
    render_portal(&state, logged_in, None, false).await
}

async fn render_portal(
    state: &AppState,
    logged_in: bool,
    flash: Option<&str>,
    flash_is_error: bool,
) -> Html<String> {
    let positions = state.store().positions().await;

    let listings = if positions.is_empty() {
        r#"<section class="panel"><p class="note">No open positions right now. Check back soon.</p></section>"#
            .to_string()
    } else {
        positions
            .iter()
            .map(|position| {
                format!(
                    r#"        <section class="panel">
            <h2>{title}</h2>
            <p class="note">{description}</p>
            <form method="post" action="/apply/{id}" enctype="multipart/form-data">
                <div class="field">
                    <label for="resume-{id}">Resume (PDF)</label>
                    <input id="resume-{id}" type="file" name="resume_file" accept=".pdf" required>
                </div>
                <button type="submit">Apply</button>
            </form>
        </section>"#,
                    id = position.id,
                    title = escape_html(&position.title),
                    description = escape_html(&position.description),
                )
            })
            .collect()
    };

    let body = format!("{}\n{}", flash_banner(flash, flash_is_error), listings);
    applicant_page("Open Positions · TalentScreen", "Open Positions", logged_in, body)
}

// ----- applying -----

pub async fn apply(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(position_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Html<String>, Redirect> {
    let session = current_session(&state, &jar).await;
    let logged_in = session.as_ref().is_some_and(|s| s.user_id.is_some());

    let Some(position) = state.store().position(position_id).await else {
        return Ok(render_portal(&state, logged_in, Some("Position not found."), true).await);
    };

    let submission = match uploads::read_resume_form(multipart, state.upload_dir()).await {
        Ok(submission) => submission,
        Err(err) => {
            warn!(%err, "rejected application upload");
            return Ok(render_portal(&state, logged_in, Some(err.message()), true).await);
        }
    };

    let Some(upload) = &submission.file else {
        return Ok(render_portal(&state, logged_in, Some("Please upload a resume file."), true).await);
    };

    let resume_text = match extract_upload_text(upload).await {
        Ok(text) => text,
        Err(message) => {
            return Ok(render_portal(&state, logged_in, Some(&message), true).await);
        }
    };

    let mut result = scoring::analyze_resume(
        state.llm_client(),
        state.lexicon(),
        &resume_text,
        &position.description,
        true,
    )
    .await;

    // An account name beats whatever extraction produced.
    let user_id = session.as_ref().and_then(|s| s.user_id);
    if let Some(session) = &session {
        if session.user_id.is_some() {
            if let Some(name) = &session.user_name {
                result.name = name.clone();
            }
        }
    }

    let candidate_id = match state
        .store()
        .save_candidate(
            result,
            Some(position_id),
            user_id,
            resume_text,
            Some(upload.original_name.clone()),
            Some(upload.stored_name.clone()),
        )
        .await
    {
        Ok(id) => id,
        Err(err) => {
            error!(?err, "failed to persist application");
            return Ok(render_portal(
                &state,
                logged_in,
                Some("Error processing your application. Please try again."),
                true,
            )
            .await);
        }
    };

    if logged_in {
        return Err(Redirect::to("/my-applications"));
    }

    let message = format!(
        "Application submitted successfully! Your Application ID is: {candidate_id}. Save this ID to track your status."
    );
    Ok(render_portal(&state, logged_in, Some(&message), false).await)
}

// ----- status lookup -----

#[derive(Deserialize)]
pub struct StatusLookupForm {
    #[serde(default)]
    pub application_id: String,
}

pub async fn application_status_page(State(state): State<AppState>, jar: CookieJar) -> Html<String> {
    let logged_in = current_session(&state, &jar)
        .await
        .is_some_and(|s| s.user_id.is_some());
    applicant_page(
        "Application Status · TalentScreen",
        "Application Status",
        logged_in,
        status_lookup_body(None, None),
    )
}

pub async fn application_status_lookup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<StatusLookupForm>,
) -> Html<String> {
    let logged_in = current_session(&state, &jar)
        .await
        .is_some_and(|s| s.user_id.is_some());

    let raw_id = form.application_id.trim();
    if raw_id.is_empty() {
        return applicant_page(
            "Application Status · TalentScreen",
            "Application Status",
            logged_in,
            status_lookup_body(None, Some("Please enter your application ID.")),
        );
    }

    let candidate = match Uuid::parse_str(raw_id) {
        Ok(id) => state.store().candidate(id).await,
        Err(_) => None,
    };

    let Some(candidate) = candidate else {
        return applicant_page(
            "Application Status · TalentScreen",
            "Application Status",
            logged_in,
            status_lookup_body(None, Some("Application not found. Please check your ID.")),
        );
    };

    let position_title = match candidate.position_id {
        Some(id) => state
            .store()
            .position(id)
            .await
            .map(|p| p.title)
            .unwrap_or_else(|| "(position removed)".to_string()),
        None => "General application".to_string(),
    };

    let detail = format!(
        r#"        <section class="panel">
            <h2>{name}</h2>
            <p><strong>Position:</strong> {position}</p>
            <p><strong>Status:</strong> {status}</p>
            <p><strong>Submitted:</strong> {created}</p>
        </section>"#,
        name = escape_html(&candidate.result.name),
        position = escape_html(&position_title),
        status = status_tag(candidate.status.as_str()),
        created = candidate.created_at.format("%Y-%m-%d %H:%M"),
    );

    applicant_page(
        "Application Status · TalentScreen",
        "Application Status",
        logged_in,
        status_lookup_body(Some(&detail), None),
    )
}

fn status_lookup_body(detail: Option<&str>, error: Option<&str>) -> String {
    format!(
        r#"        {banner}
        <section class="panel">
            <h2>Check your application</h2>
            <form method="post" action="/application_status">
                <div class="field">
                    <label for="application_id">Application ID</label>
                    <input id="application_id" name="application_id" placeholder="e.g. 1b9d6bcd-bbfd-4b2d-9b5d-ab8dfbbd4bed" required>
                </div>
                <button type="submit">Look up</button>
            </form>
        </section>
{detail}"#,
        banner = flash_banner(error, true),
        detail = detail.unwrap_or(""),
    )
}

// ----- applicant dashboard -----

pub async fn applicant_dashboard(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Html<String>, Redirect> {
    let (session, user_id) = require_applicant(&state, &jar).await?;

    let applications = state.store().candidates_for_user(user_id).await;
    let rows = if applications.is_empty() {
        r#"<tr><td colspan="4" class="note">You have not applied to any positions yet.</td></tr>"#
            .to_string()
    } else {
        let mut rows = String::new();
        for candidate in &applications {
            let position_title = match candidate.position_id {
                Some(id) => state
                    .store()
                    .position(id)
                    .await
                    .map(|p| p.title)
                    .unwrap_or_else(|| "(position removed)".to_string()),
                None => "General application".to_string(),
            };
            rows.push_str(&format!(
                r#"<tr>
                    <td>{position}</td>
                    <td>{status}</td>
                    <td>{created}</td>
                    <td>{id}</td>
                </tr>"#,
                position = escape_html(&position_title),
                status = status_tag(candidate.status.as_str()),
                created = candidate.created_at.format("%Y-%m-%d %H:%M"),
                id = candidate.id,
            ));
        }
        rows
    };

    let greeting = session
        .user_name
        .as_deref()
        .map(escape_html)
        .unwrap_or_default();
    let body = format!(
        r#"        <section class="panel">
            <h2>Welcome, {greeting}</h2>
            <table>
                <thead><tr><th>Position</th><th>Status</th><th>Submitted</th><th>Application ID</th></tr></thead>
                <tbody>{rows}</tbody>
            </table>
            <p class="note"><a href="/portal">Browse open positions</a></p>
            <form method="post" action="/logout"><button type="submit">Log out</button></form>
        </section>"#
    );
    Ok(applicant_page(
        "My Applications · TalentScreen",
        "My Applications",
        true,
        body,
    ))
}
