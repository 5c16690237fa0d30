//! HTML for the viewer page.

use chrono::{DateTime, Utc};

use crate::auth::csrf::CSRF_FIELD;

/// One entry as shown in the viewer.
#[derive(Debug, Clone)]
pub struct ViewEntry {
    pub id: String,
    pub modified: DateTime<Utc>,
    pub ip: Option<String>,
    pub size: usize,
    /// Body decoded as UTF-8, invalid sequences replaced
    pub body: String,
}

/// Everything the viewer page shows.
#[derive(Debug, Clone)]
pub struct ViewPage {
    /// Newest first
    pub entries: Vec<ViewEntry>,
    /// Current post token, empty when disabled
    pub post_token: String,
    pub csrf_token: String,
    /// Example submission commands for the current token
    pub examples: Vec<String>,
}

/// Example `curl` invocations for submitting to `url`.
pub fn example_commands(url: &str, post_token: &str) -> Vec<String> {
    if post_token.is_empty() {
        vec![
            format!("curl --data-binary @message.txt {url}"),
            format!("echo 'hello' | curl --data-binary @- {url}"),
        ]
    } else {
        vec![
            format!("curl -u {post_token}: --data-binary @message.txt {url}"),
            format!("echo 'hello' | curl -H 'X-Inbx-Token: {post_token}' --data-binary @- {url}"),
        ]
    }
}

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn token_form(action: &str, label: &str, csrf_token: &str) -> String {
    format!(
        r#"<form method="post" action="{action}"><input type="hidden" name="{field}" value="{csrf}"><button type="submit">{label}</button></form>"#,
        action = action,
        field = CSRF_FIELD,
        csrf = html_escape(csrf_token),
        label = label,
    )
}

pub fn render_view(page: &ViewPage) -> String {
    let token_line = if page.post_token.is_empty() {
        "<p>Post token: <em>disabled</em>, anyone can submit.</p>".to_string()
    } else {
        format!(
            r#"<p>Post token: <code class="token">{}</code></p>"#,
            html_escape(&page.post_token)
        )
    };

    let examples: String = page
        .examples
        .iter()
        .map(|cmd| format!("<pre>{}</pre>\n", html_escape(cmd)))
        .collect();

    let entries: String = if page.entries.is_empty() {
        "<p>No entries yet.</p>".to_string()
    } else {
        page.entries
            .iter()
            .map(|entry| {
                format!(
                    r#"<article class="entry" id="{id}">
<header><a href="/inbx/view/{id}">{modified}</a> · {ip} · {size} bytes</header>
<pre>{body}</pre>
</article>
"#,
                    id = html_escape(&entry.id),
                    modified = entry.modified.format("%Y-%m-%d %H:%M:%S UTC"),
                    ip = html_escape(entry.ip.as_deref().unwrap_or("unknown")),
                    size = entry.size,
                    body = html_escape(&entry.body),
                )
            })
            .collect()
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>inbx</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 60rem; margin: 2rem auto; padding: 0 1rem; }}
        pre {{ white-space: pre-wrap; word-break: break-word; background: #f4f4f4; padding: 0.5rem; border-radius: 4px; }}
        .entry header {{ color: #555; font-size: 0.9rem; }}
        form {{ display: inline-block; margin-right: 0.5rem; }}
    </style>
</head>
<body>
    <h1>inbx</h1>
    <section>
        {token_line}
        {generate}
        {unset}
        {examples}
    </section>
    <h2>Entries ({count})</h2>
    {entries}
</body>
</html>"#,
        token_line = token_line,
        generate = token_form("/inbx/token/generate", "Generate new token", &page.csrf_token),
        unset = token_form("/inbx/token/unset", "Disable token", &page.csrf_token),
        examples = examples,
        count = page.entries.len(),
        entries = entries,
    )
}
