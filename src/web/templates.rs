use std::borrow::Cow;

use chrono::{Datelike, Utc};

const PAGE_BASE_STYLES: &str = r#"
        :root { color-scheme: light; }
        body { font-family: "Helvetica Neue", Arial, sans-serif; margin: 0; background: #f8fafc; color: #0f172a; }
        header { background: #ffffff; padding: 1.75rem 1.5rem; border-bottom: 1px solid #e2e8f0; }
        .header-bar { display: flex; justify-content: space-between; align-items: center; flex-wrap: wrap; gap: 1rem; }
        .header-bar h1 { margin: 0; font-size: 1.5rem; }
        nav.top-nav { display: flex; gap: 0.75rem; align-items: center; flex-wrap: wrap; }
        nav.top-nav a { display: inline-flex; align-items: center; gap: 0.4rem; color: #1d4ed8; text-decoration: none; font-weight: 600; background: #e0f2fe; padding: 0.45rem 0.9rem; border-radius: 999px; border: 1px solid #bfdbfe; }
        nav.top-nav a:hover { background: #bfdbfe; border-color: #93c5fd; }
        main { padding: 2rem 1.5rem; max-width: 1080px; margin: 0 auto; box-sizing: border-box; }
        section { margin-bottom: 2.5rem; }
        .panel { background: #ffffff; border-radius: 12px; border: 1px solid #e2e8f0; padding: 1.5rem; box-shadow: 0 18px 40px rgba(15, 23, 42, 0.08); }
        .panel h2 { margin-top: 0; }
        label { display: block; margin-bottom: 0.5rem; font-weight: 600; color: #0f172a; }
        input, textarea, select { width: 100%; padding: 0.75rem; border-radius: 8px; border: 1px solid #cbd5f5; background: #f8fafc; color: #0f172a; box-sizing: border-box; font-size: 1rem; }
        input:focus, textarea:focus, select:focus { outline: none; border-color: #2563eb; box-shadow: 0 0 0 3px rgba(37, 99, 235, 0.12); }
        input[type="checkbox"] { width: auto; margin-right: 0.5rem; }
        input[type="file"] { background: #ffffff; }
        textarea { min-height: 10rem; resize: vertical; }
        form .field { margin-bottom: 1.1rem; }
        button { padding: 0.85rem 1.2rem; border: none; border-radius: 8px; background: #2563eb; color: #ffffff; font-weight: 600; cursor: pointer; }
        button:hover { background: #1d4ed8; }
        button.danger { background: #dc2626; }
        button.danger:hover { background: #b91c1c; }
        table { width: 100%; border-collapse: collapse; margin-top: 1.25rem; background: #ffffff; border: 1px solid #e2e8f0; border-radius: 12px; overflow: hidden; }
        th, td { padding: 0.75rem 1rem; border-bottom: 1px solid #e2e8f0; text-align: left; }
        th { background: #f1f5f9; color: #0f172a; font-weight: 600; }
        .note { color: #475569; font-size: 0.95rem; line-height: 1.6; }
        .stat-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(180px, 1fr)); gap: 1rem; }
        .stat-card { background: #ffffff; border: 1px solid #e2e8f0; border-radius: 12px; padding: 1.25rem; text-align: center; }
        .stat-card .value { font-size: 2rem; font-weight: 700; color: #1d4ed8; }
        .stat-card .label { color: #475569; font-size: 0.9rem; }
        .status-tag { display: inline-flex; align-items: center; padding: 0.25rem 0.75rem; border-radius: 999px; font-size: 0.85rem; font-weight: 600; }
        .status-tag.pending { background: #fef3c7; color: #92400e; }
        .status-tag.accepted { background: #dcfce7; color: #166534; }
        .status-tag.rejected { background: #fee2e2; color: #b91c1c; }
        .score { font-weight: 700; color: #1d4ed8; }
        .evidence { color: #475569; font-size: 0.92rem; }
        .skill-tag { display: inline-block; background: #e0f2fe; color: #1d4ed8; border-radius: 999px; padding: 0.2rem 0.7rem; margin: 0.15rem; font-size: 0.85rem; font-weight: 600; }
        .message { margin: 0 0 1.25rem; padding: 0.85rem 1rem; border-radius: 8px; }
        .message.error { background: #fee2e2; color: #b91c1c; }
        .message.success { background: #dcfce7; color: #166534; }
        .app-footer { margin-top: 3rem; text-align: center; font-size: 0.85rem; color: #94a3b8; }
        @media (max-width: 768px) {
            header { padding: 1.25rem 1rem; }
            main { padding: 1.5rem 1rem; }
            .header-bar { flex-direction: column; align-items: flex-start; }
            table { font-size: 0.9rem; }
            th, td { padding: 0.5rem; }
        }
"#;

pub struct NavLink<'a> {
    pub href: &'a str,
    pub label: &'a str,
}

pub struct PageLayout<'a> {
    pub meta_title: &'a str,
    pub page_heading: &'a str,
    pub nav_links: Vec<NavLink<'a>>,
    pub body_html: Cow<'a, str>,
    pub extra_style_blocks: Vec<Cow<'a, str>>,
}

pub fn render_page(layout: PageLayout<'_>) -> String {
    let PageLayout {
        meta_title,
        page_heading,
        nav_links,
        body_html,
        extra_style_blocks,
    } = layout;

    let nav_html = nav_links
        .into_iter()
        .map(|link| {
            format!(
                r#"<a href="{href}">{label}</a>"#,
                href = link.href,
                label = link.label,
            )
        })
        .collect::<Vec<_>>()
        .join("\n                ");

    let styles = std::iter::once(Cow::Borrowed(PAGE_BASE_STYLES))
        .chain(extra_style_blocks.into_iter())
        .map(|block| block.into_owned())
        .collect::<Vec<_>>()
        .join("\n");

    let footer = render_footer();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{meta_title}</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="robots" content="noindex,nofollow">
    <style>
{styles}
    </style>
</head>
<body>
    <header>
        <div class="header-bar">
            <h1>{page_heading}</h1>
            <nav class="top-nav">
                {nav_html}
            </nav>
        </div>
    </header>
    <main>
{body_html}
        {footer}
    </main>
</body>
</html>"#,
        meta_title = meta_title,
        page_heading = page_heading,
        nav_html = nav_html,
        body_html = body_html,
        styles = styles,
        footer = footer,
    )
}

/// Centered single-panel page used for the login and registration forms.
pub fn render_form_page(meta_title: &str, panel_html: &str) -> String {
    let footer = render_footer();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{meta_title}</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="robots" content="noindex,nofollow">
    <style>
        :root {{ color-scheme: light; }}
        body {{ font-family: "Helvetica Neue", Arial, sans-serif; display: flex; flex-direction: column; align-items: center; justify-content: center; min-height: 100vh; margin: 0; background: #f1f5f9; color: #0f172a; padding: 1.5rem; box-sizing: border-box; gap: 1.5rem; }}
        main {{ width: 100%; max-width: 480px; display: flex; flex-direction: column; align-items: center; gap: 1.5rem; }}
        .panel {{ background: #ffffff; padding: 2.5rem 2.25rem; border-radius: 18px; box-shadow: 0 20px 60px rgba(15, 23, 42, 0.08); width: 100%; border: 1px solid #e2e8f0; box-sizing: border-box; }}
        h1 {{ margin: 0 0 1rem; font-size: 1.8rem; text-align: center; }}
        p.description {{ margin: 0 0 1.75rem; color: #475569; text-align: center; font-size: 0.95rem; }}
        label {{ display: block; margin-top: 1.2rem; font-weight: 600; letter-spacing: 0.01em; color: #0f172a; }}
        input {{ width: 100%; padding: 0.85rem; margin-top: 0.65rem; border-radius: 10px; border: 1px solid #cbd5f5; background: #f8fafc; color: #0f172a; font-size: 1rem; box-sizing: border-box; }}
        input:focus {{ outline: none; border-color: #2563eb; box-shadow: 0 0 0 3px rgba(37, 99, 235, 0.15); }}
        button {{ margin-top: 2rem; width: 100%; padding: 0.95rem; border: none; border-radius: 10px; background: #2563eb; color: #ffffff; font-weight: 600; font-size: 1.05rem; cursor: pointer; }}
        button:hover {{ background: #1d4ed8; }}
        .alt-link {{ text-align: center; margin-top: 1.5rem; font-size: 0.95rem; }}
        .alt-link a {{ color: #2563eb; text-decoration: none; font-weight: 600; }}
        .message.error {{ margin: 0 0 1rem; padding: 0.85rem 1rem; border-radius: 8px; background: #fee2e2; color: #b91c1c; }}
        .app-footer {{ margin-top: 2.5rem; text-align: center; font-size: 0.85rem; color: #64748b; }}
    </style>
</head>
<body>
    <main>
        <section class="panel">
{panel_html}
        </section>
        {footer}
    </main>
</body>
</html>"#,
        meta_title = meta_title,
        panel_html = panel_html,
        footer = footer,
    )
}

pub fn render_footer() -> String {
    let current_year = Utc::now().year();
    format!(
        r#"<footer class="app-footer">© {year} TalentScreen Recruiting</footer>"#,
        year = current_year
    )
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn status_tag(status: &str) -> String {
    format!(
        r#"<span class="status-tag {status}">{status}</span>"#,
        status = escape_html(status)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_html_neutralizes_markup() {
        assert_eq!(
            escape_html(r#"<b>"O'Brien" & co</b>"#),
            "&lt;b&gt;&quot;O&#39;Brien&quot; &amp; co&lt;/b&gt;"
        );
    }

    #[test]
    fn page_contains_heading_and_nav() {
        let html = render_page(PageLayout {
            meta_title: "Dashboard",
            page_heading: "Candidate Dashboard",
            nav_links: vec![NavLink {
                href: "/overview",
                label: "Overview",
            }],
            body_html: "<p>body</p>".into(),
            extra_style_blocks: Vec::new(),
        });
        assert!(html.contains("Candidate Dashboard"));
        assert!(html.contains(r#"<a href="/overview">Overview</a>"#));
        assert!(html.contains("<p>body</p>"));
    }
}
