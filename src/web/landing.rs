use axum::{extract::State, response::Html};
use axum_extra::extract::cookie::CookieJar;

use crate::web::{
    AppState,
    auth::current_session,
    templates::{NavLink, PageLayout, render_page},
};

pub async fn landing_page(State(state): State<AppState>, jar: CookieJar) -> Html<String> {
    let session = current_session(&state, &jar).await;

    let mut nav_links = vec![NavLink {
        href: "/portal",
        label: "Open Positions",
    }];
    match &session {
        Some(session) if session.is_hr => nav_links.push(NavLink {
            href: "/overview",
            label: "HR Dashboard",
        }),
        Some(_) => nav_links.push(NavLink {
            href: "/my-applications",
            label: "My Applications",
        }),
        None => {
            nav_links.push(NavLink {
                href: "/login",
                label: "Applicant Sign-In",
            });
            nav_links.push(NavLink {
                href: "/hr/login",
                label: "Recruiter Sign-In",
            });
        }
    }

    let body = r#"        <section class="panel">
            <h2>AI-assisted resume screening</h2>
            <p class="note">TalentScreen evaluates resumes against open positions. Each submission is scored on Python proficiency, work experience and university background, producing a ranked shortlist for recruiters.</p>
        </section>
        <section class="panel">
            <h2>For applicants</h2>
            <p class="note">Browse <a href="/portal">open positions</a> and apply with a PDF resume. You can <a href="/register">create an account</a> to track your applications, or apply as a guest and check progress with your application ID on the <a href="/application_status">status page</a>.</p>
        </section>
        <section class="panel">
            <h2>For recruiters</h2>
            <p class="note"><a href="/hr/login">Sign in</a> to manage positions, analyze resumes and review the ranked candidate dashboard.</p>
        </section>"#;

    Html(render_page(PageLayout {
        meta_title: "TalentScreen",
        page_heading: "TalentScreen Recruiting",
        nav_links,
        body_html: body.into(),
        extra_style_blocks: Vec::new(),
    }))
}
