use axum::{
    extract::{Form, Multipart, Path, Query, State},
    http::StatusCode,
    response::{Html, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    scoring,
    utils::pdf_text,
    web::{
        AppState,
        auth::require_hr,
        models::{CandidateRecord, CandidateStatus, Position},
        templates::{NavLink, PageLayout, escape_html, render_page, status_tag},
        uploads,
    },
};

fn hr_nav() -> Vec<NavLink<'static>> {
    vec![
        NavLink {
            href: "/overview",
            label: "Overview",
        },
        NavLink {
            href: "/employer",
            label: "Positions",
        },
        NavLink {
            href: "/analyze",
            label: "Analyze Resume",
        },
        NavLink {
            href: "/dashboard",
            label: "Dashboard",
        },
    ]
}

// Logout is a POST; expose it in the nav via a tiny form instead of a link.
const LOGOUT_FORM: &str = r#"<form method="post" action="/logout" style="display:inline"><button type="submit">Log out</button></form>"#;

fn hr_page(meta_title: &str, heading: &str, body_html: String) -> Html<String> {
    let mut html = render_page(PageLayout {
        meta_title,
        page_heading: heading,
        nav_links: hr_nav(),
        body_html: body_html.into(),
        extra_style_blocks: Vec::new(),
    });
    html = html.replacen("</nav>", &format!("{LOGOUT_FORM}\n            </nav>"), 1);
    Html(html)
}

// ----- overview -----

pub async fn overview(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Html<String>, Redirect> {
    require_hr(&state, &jar).await?;
    let stats = state.store().overview_stats().await;

    let cards = [
        ("Total candidates", stats.total_candidates),
        ("Open positions", stats.total_positions),
        ("Applied today", stats.today_applicants),
        ("Hires this month", stats.hires_this_month),
        ("Pending review", stats.pending_count),
        ("Accepted", stats.accepted_count),
        ("Rejected", stats.rejected_count),
    ]
    .iter()
    .map(|(label, value)| {
        format!(
            r#"<div class="stat-card"><div class="value">{value}</div><div class="label">{label}</div></div>"#
        )
    })
    .collect::<String>();

    let body = format!(
        r#"        <section>
            <div class="stat-grid">{cards}</div>
        </section>
        <section class="panel">
            <h2>Quick actions</h2>
            <p class="note"><a href="/analyze">Analyze a resume</a> · <a href="/employer">Manage positions</a> · <a href="/dashboard">Review candidates</a></p>
        </section>"#
    );
    Ok(hr_page("Overview · TalentScreen", "Recruiting Overview", body))
}

// ----- positions -----

#[derive(Default, Deserialize)]
pub struct EmployerQuery {
    pub selected: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct PositionForm {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

pub async fn employer_portal(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<EmployerQuery>,
) -> Result<Html<String>, Redirect> {
    require_hr(&state, &jar).await?;

    let positions = state.store().positions().await;
    let selected = match params.selected {
        Some(id) => state.store().position(id).await,
        None => None,
    };

    let rows = if positions.is_empty() {
        r#"<tr><td colspan="3" class="note">No positions yet. Create one below.</td></tr>"#.to_string()
    } else {
        positions
            .iter()
            .map(|position| {
                format!(
                    r#"<tr>
                        <td><a href="/employer?selected={id}">{title}</a></td>
                        <td><a href="/dashboard/{id}">Candidates</a> · <a href="/analyze/{id}">Analyze</a></td>
                        <td><form method="post" action="/position/{id}/delete" onsubmit="return confirm('Delete this position and all of its candidates?');"><button class="danger" type="submit">Delete</button></form></td>
                    </tr>"#,
                    id = position.id,
                    title = escape_html(&position.title),
                )
            })
            .collect()
    };

    let edit_panel = selected
        .map(|position| {
            format!(
                r#"        <section class="panel">
            <h2>Edit position</h2>
            <form method="post" action="/position/{id}/edit">
                <div class="field">
                    <label for="edit-title">Title</label>
                    <input id="edit-title" name="title" value="{title}" required>
                </div>
                <div class="field">
                    <label for="edit-description">Job description</label>
                    <textarea id="edit-description" name="description">{description}</textarea>
                </div>
                <button type="submit">Save changes</button>
            </form>
        </section>"#,
                id = position.id,
                title = escape_html(&position.title),
                description = escape_html(&position.description),
            )
        })
        .unwrap_or_default();

    let body = format!(
        r#"        <section class="panel">
            <h2>Open positions</h2>
            <table>
                <thead><tr><th>Title</th><th>Links</th><th></th></tr></thead>
                <tbody>{rows}</tbody>
            </table>
        </section>
{edit_panel}
        <section class="panel">
            <h2>Create position</h2>
            <form method="post" action="/position/add">
                <div class="field">
                    <label for="title">Title</label>
                    <input id="title" name="title" required>
                </div>
                <div class="field">
                    <label for="description">Job description</label>
                    <textarea id="description" name="description" placeholder="Paste the job description used to score applicants."></textarea>
                </div>
                <button type="submit">Create</button>
            </form>
        </section>"#
    );
    Ok(hr_page("Positions · TalentScreen", "Employer Portal", body))
}

pub async fn add_position(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<PositionForm>,
) -> Result<Redirect, Redirect> {
    require_hr(&state, &jar).await?;

    let title = form.title.trim();
    if title.is_empty() {
        return Ok(Redirect::to("/employer"));
    }

    match state
        .store()
        .save_position(title, form.description.trim())
        .await
    {
        Ok(id) => Ok(Redirect::to(&format!("/employer?selected={id}"))),
        Err(err) => {
            error!(?err, "failed to save position");
            Ok(Redirect::to("/employer"))
        }
    }
}

pub async fn edit_position(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(position_id): Path<Uuid>,
    Form(form): Form<PositionForm>,
) -> Result<Redirect, Redirect> {
    require_hr(&state, &jar).await?;

    let title = form.title.trim();
    if !title.is_empty() {
        if let Err(err) = state
            .store()
            .update_position(position_id, title, form.description.trim())
            .await
        {
            error!(?err, %position_id, "failed to update position");
        }
    }
    Ok(Redirect::to(&format!("/employer?selected={position_id}")))
}

pub async fn delete_position(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(position_id): Path<Uuid>,
) -> Result<Redirect, Redirect> {
    require_hr(&state, &jar).await?;

    match state.store().delete_position(position_id).await {
        Ok(removed) => {
            for candidate in removed {
                remove_stored_file(&state, &candidate).await;
            }
        }
        Err(err) => error!(?err, %position_id, "failed to delete position"),
    }
    Ok(Redirect::to("/employer"))
}

// ----- analyze -----

pub async fn analyze_page(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Html<String>, Redirect> {
    render_analyze_page(state, jar, None).await
}

pub async fn analyze_page_for_position(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(position_id): Path<Uuid>,
) -> Result<Html<String>, Redirect> {
    render_analyze_page(state, jar, Some(position_id)).await
}

async fn render_analyze_page(
    state: AppState,
    jar: CookieJar,
    selected: Option<Uuid>,
) -> Result<Html<String>, Redirect> {
    require_hr(&state, &jar).await?;

    let positions = state.store().positions().await;
    if positions.is_empty() {
        return Err(Redirect::to("/employer"));
    }

    let options = position_options(&positions, selected);
    let body = format!(
        r#"        <section class="panel">
            <h2>Analyze a resume</h2>
            <p class="note">Paste resume text or upload a PDF. When AI analysis is enabled the resume is scored by a language model, with a rule-based fallback.</p>
            <form method="post" action="/process_analysis" enctype="multipart/form-data">
                <div class="field">
                    <label for="position_id">Position</label>
                    <select id="position_id" name="position_id">{options}</select>
                </div>
                <div class="field">
                    <label for="resume_text">Resume text</label>
                    <textarea id="resume_text" name="resume_text" placeholder="Paste the resume text here."></textarea>
                </div>
                <div class="field">
                    <label for="resume_file">Or upload a PDF</label>
                    <input id="resume_file" type="file" name="resume_file" accept=".pdf">
                </div>
                <div class="field">
                    <label><input type="checkbox" name="use_ai" checked> Use AI analysis</label>
                </div>
                <button type="submit">Analyze</button>
            </form>
        </section>"#
    );
    Ok(hr_page("Analyze · TalentScreen", "Resume Analysis", body))
}

fn position_options(positions: &[Position], selected: Option<Uuid>) -> String {
    positions
        .iter()
        .map(|position| {
            let marker = if selected == Some(position.id) {
                " selected"
            } else {
                ""
            };
            format!(
                r#"<option value="{id}"{marker}>{title}</option>"#,
                id = position.id,
                title = escape_html(&position.title),
            )
        })
        .collect()
}

pub async fn process_analysis(
    State(state): State<AppState>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<Redirect, (StatusCode, Html<String>)> {
    if require_hr(&state, &jar).await.is_err() {
        return Ok(Redirect::to("/hr/login"));
    }

    let submission = match uploads::read_resume_form(multipart, state.upload_dir()).await {
        Ok(submission) => submission,
        Err(err) => {
            warn!(%err, "rejected resume submission");
            return Err(plain_error(StatusCode::BAD_REQUEST, err.message()));
        }
    };

    let use_ai = submission.text("use_ai") == Some("on");
    let position_id = submission
        .text("position_id")
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok());
    let position = match position_id {
        Some(id) => state.store().position(id).await,
        None => None,
    };
    let job_description = position
        .as_ref()
        .map(|p| p.description.clone())
        .unwrap_or_default();

    let (resume_text, source_file, stored_file) = match &submission.file {
        Some(upload) => {
            let text = match extract_upload_text(upload).await {
                Ok(text) => text,
                Err(message) => return Err(plain_error(StatusCode::BAD_REQUEST, &message)),
            };
            (
                text,
                Some(upload.original_name.clone()),
                Some(upload.stored_name.clone()),
            )
        }
        None => {
            let text = submission.text("resume_text").unwrap_or("").trim().to_string();
            if text.is_empty() {
                return Err(plain_error(
                    StatusCode::BAD_REQUEST,
                    "Resume text or a PDF file is required.",
                ));
            }
            (text, None, None)
        }
    };

    let result = scoring::analyze_resume(
        state.llm_client(),
        state.lexicon(),
        &resume_text,
        &job_description,
        use_ai,
    )
    .await;

    let candidate_id = state
        .store()
        .save_candidate(result, position_id, None, resume_text, source_file, stored_file)
        .await
        .map_err(|err| {
            error!(?err, "failed to persist analyzed candidate");
            plain_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not save the analysis result.",
            )
        })?;

    Ok(Redirect::to(&format!("/candidate/{candidate_id}")))
}

/// PDF parsing is CPU-bound, so it runs off the async runtime.
pub(crate) async fn extract_upload_text(upload: &uploads::SavedUpload) -> Result<String, String> {
    let path = upload.stored_path.clone();
    let extracted = tokio::task::spawn_blocking(move || pdf_text::extract_text_from_pdf(&path)).await;
    match extracted {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(err)) => {
            warn!(%err, file = %upload.original_name, "failed to extract text from upload");
            // The stored file is useless without text; drop it.
            let _ = tokio::fs::remove_file(&upload.stored_path).await;
            Err("Could not extract text from the uploaded PDF.".to_string())
        }
        Err(err) => {
            error!(?err, "pdf extraction task panicked");
            let _ = tokio::fs::remove_file(&upload.stored_path).await;
            Err("Could not extract text from the uploaded PDF.".to_string())
        }
    }
}

fn plain_error(status: StatusCode, message: &str) -> (StatusCode, Html<String>) {
    (
        status,
        Html(format!(
            r#"<h1>Request failed</h1><p>{}</p><p><a href="/">Back</a></p>"#,
            escape_html(message)
        )),
    )
}

// ----- dashboard and candidate views -----

pub async fn dashboard(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Html<String>, Redirect> {
    render_dashboard(state, jar, None).await
}

pub async fn dashboard_for_position(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(position_id): Path<Uuid>,
) -> Result<Html<String>, Redirect> {
    render_dashboard(state, jar, Some(position_id)).await
}

async fn render_dashboard(
    state: AppState,
    jar: CookieJar,
    position_id: Option<Uuid>,
) -> Result<Html<String>, Redirect> {
    require_hr(&state, &jar).await?;

    let positions = state.store().positions().await;
    let mut candidates = match position_id {
        Some(id) => state.store().candidates_for_position(id).await,
        None => state.store().candidates().await,
    };
    // Best candidates first; ties keep insertion order.
    candidates.sort_by(|a, b| {
        b.result
            .final_rank_score
            .partial_cmp(&a.result.final_rank_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let filter_links = std::iter::once(r#"<a href="/dashboard">All</a>"#.to_string())
    .chain(positions.iter().map(|position| {
        format!(
            r#"<a href="/dashboard/{id}">{title}</a>"#,
            id = position.id,
            title = escape_html(&position.title),
        )
    }))
    .collect::<Vec<_>>()
    .join(" · ");

    let rows = if candidates.is_empty() {
        r#"<tr><td colspan="6" class="note">No candidates yet.</td></tr>"#.to_string()
    } else {
        candidates
            .iter()
            .map(|candidate| {
                format!(
                    r#"<tr>
                        <td><a href="/candidate/{id}">{name}</a></td>
                        <td>{university}</td>
                        <td class="score">{final_score:.2}</td>
                        <td>{status}</td>
                        <td>{method}</td>
                        <td>{created}</td>
                    </tr>"#,
                    id = candidate.id,
                    name = escape_html(&candidate.result.name),
                    university = escape_html(&candidate.result.university),
                    final_score = candidate.result.final_rank_score,
                    status = status_tag(candidate.status.as_str()),
                    method = escape_html(&candidate.result.analysis_method),
                    created = candidate.created_at.format("%Y-%m-%d %H:%M"),
                )
            })
            .collect()
    };

    let body = format!(
        r#"        <section class="panel">
            <h2>Candidates</h2>
            <p class="note">Filter: {filter_links}</p>
            <table>
                <thead><tr><th>Name</th><th>University</th><th>Final score</th><th>Status</th><th>Method</th><th>Submitted</th></tr></thead>
                <tbody>{rows}</tbody>
            </table>
        </section>"#
    );
    Ok(hr_page("Dashboard · TalentScreen", "Candidate Dashboard", body))
}

pub async fn candidate_detail(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(candidate_id): Path<Uuid>,
) -> Result<Html<String>, Redirect> {
    require_hr(&state, &jar).await?;

    let Some(candidate) = state.store().candidate(candidate_id).await else {
        return Err(Redirect::to("/dashboard"));
    };

    let position_line = match candidate.position_id {
        Some(id) => match state.store().position(id).await {
            Some(position) => format!(
                r#"<p><strong>Position:</strong> <a href="/dashboard/{id}">{title}</a></p>"#,
                title = escape_html(&position.title),
            ),
            None => String::new(),
        },
        None => String::new(),
    };

    let skills = if candidate.result.skills.is_empty() {
        r#"<span class="note">No skills extracted.</span>"#.to_string()
    } else {
        candidate
            .result
            .skills
            .iter()
            .map(|skill| format!(r#"<span class="skill-tag">{}</span>"#, escape_html(skill)))
            .collect()
    };

    let r = &candidate.result;
    let body = format!(
        r#"        <section class="panel">
            <h2>{name}</h2>
            <p><strong>University:</strong> {university}</p>
            {position_line}
            <p><strong>Status:</strong> {status} · <strong>Method:</strong> {method} · <strong>Submitted:</strong> {created}</p>
            <p><strong>Final rank score:</strong> <span class="score">{final_score:.2}</span> / 10</p>
        </section>
        <section class="panel">
            <h2>Score breakdown</h2>
            <table>
                <thead><tr><th>Dimension</th><th>Score</th><th>Evidence</th></tr></thead>
                <tbody>
                    <tr><td>Python proficiency</td><td class="score">{python_score}</td><td class="evidence">{python_evidence}</td></tr>
                    <tr><td>Experience ({years} yr)</td><td class="score">{experience_score}</td><td class="evidence">{experience_evidence}</td></tr>
                    <tr><td>University tier</td><td class="score">{uni_tier_score}</td><td class="evidence">{uni_evidence}</td></tr>
                </tbody>
            </table>
        </section>
        <section class="panel">
            <h2>Skills</h2>
            <p>{skills}</p>
        </section>
        <section class="panel">
            <h2>Actions</h2>
            <form method="post" action="/update_status/{id}" style="display:inline">
                <select name="status" style="width:auto; display:inline-block;">
                    <option value="pending"{sel_pending}>Pending</option>
                    <option value="accepted"{sel_accepted}>Accepted</option>
                    <option value="rejected"{sel_rejected}>Rejected</option>
                </select>
                <button type="submit">Update status</button>
            </form>
            <form method="post" action="/delete_candidate/{id}" style="display:inline" onsubmit="return confirm('Delete this candidate?');">
                <button class="danger" type="submit">Delete candidate</button>
            </form>
        </section>"#,
        name = escape_html(&r.name),
        university = escape_html(&r.university),
        position_line = position_line,
        status = status_tag(candidate.status.as_str()),
        method = escape_html(&r.analysis_method),
        created = candidate.created_at.format("%Y-%m-%d %H:%M"),
        final_score = r.final_rank_score,
        python_score = r.python_score,
        python_evidence = escape_html(&r.python_evidence),
        experience_score = r.experience_score,
        experience_evidence = escape_html(&r.experience_evidence),
        years = r.python_experience_years,
        uni_tier_score = r.uni_tier_score,
        uni_evidence = escape_html(&r.uni_evidence),
        skills = skills,
        id = candidate.id,
        sel_pending = selected_if(candidate.status, CandidateStatus::Pending),
        sel_accepted = selected_if(candidate.status, CandidateStatus::Accepted),
        sel_rejected = selected_if(candidate.status, CandidateStatus::Rejected),
    );
    Ok(hr_page("Candidate · TalentScreen", "Candidate Detail", body))
}

fn selected_if(actual: CandidateStatus, expected: CandidateStatus) -> &'static str {
    if actual == expected { " selected" } else { "" }
}

#[derive(Deserialize)]
pub struct StatusForm {
    pub status: String,
}

pub async fn update_status(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(candidate_id): Path<Uuid>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect, Redirect> {
    require_hr(&state, &jar).await?;

    match form.status.parse::<CandidateStatus>() {
        Ok(status) => {
            if let Err(err) = state.store().set_candidate_status(candidate_id, status).await {
                error!(?err, %candidate_id, "failed to update candidate status");
            }
        }
        Err(()) => warn!(status = %form.status, "ignoring unknown candidate status"),
    }
    Ok(Redirect::to(&format!("/candidate/{candidate_id}")))
}

pub async fn delete_candidate(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(candidate_id): Path<Uuid>,
) -> Result<Redirect, Redirect> {
    require_hr(&state, &jar).await?;

    match state.store().delete_candidate(candidate_id).await {
        Ok(Some(candidate)) => remove_stored_file(&state, &candidate).await,
        Ok(None) => {}
        Err(err) => error!(?err, %candidate_id, "failed to delete candidate"),
    }
    Ok(Redirect::to("/dashboard"))
}

/// Best effort: a missing or undeletable file never blocks record removal.
async fn remove_stored_file(state: &AppState, candidate: &CandidateRecord) {
    if let Some(stored) = &candidate.stored_file {
        let path = state.upload_dir().join(stored);
        if let Err(err) = tokio::fs::remove_file(&path).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(?err, file = %path.display(), "failed to remove stored resume file");
            }
        }
    }
}
