//! HTML fragments for the browse views. Every interpolated value is escaped.

use crate::clients::github::DirEntry;
use crate::clients::github::EntryKind;
use crate::clients::github::PullRequest;
use crate::error::WorkflowError;

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

pub fn render_file_list(entries: &[DirEntry]) -> String {
    if entries.is_empty() {
        return "<p>No files in repository</p>".to_string();
    }

    let rows = entries.iter().filter_map(|entry| match entry.kind {
        EntryKind::File => Some(format!(
            r##"<div class="entry file"><a href="#" data-path="{}" onclick="loadFile(this.dataset.path); return false;">📄 {}</a></div>"##,
            escape(&entry.path),
            escape(&entry.name)
        )),
        EntryKind::Dir => Some(format!(
            r#"<div class="entry dir">📁 {}/</div>"#,
            escape(&entry.name)
        )),
        EntryKind::Other => None,
    });

    std::iter::once("<h3>Repository Files</h3>".to_string())
        .chain(rows)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_pull_requests(prs: &[PullRequest]) -> String {
    if prs.is_empty() {
        return "<p>No open PRs</p>".to_string();
    }

    let cards = prs.iter().map(|pr| {
        let body = pr
            .body
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or("No description");
        [
            r#"<div class="pr">"#.to_string(),
            format!("<h4>PR #{}: {}</h4>", pr.number, escape(&pr.title)),
            format!("<p>{}</p>", escape(body)),
            format!(
                "<p>From: {} → {}</p>",
                escape(&pr.head_ref),
                escape(&pr.base_ref)
            ),
            r##"<form hx-post="/merge-pr" hx-target="#status" hx-swap="innerHTML">"##.to_string(),
            format!(
                r#"<input type="hidden" name="prNumber" value="{}">"#,
                pr.number
            ),
            format!(
                r#"<input type="hidden" name="commitTitle" value="Merge pull request #{}">"#,
                pr.number
            ),
            r#"<button type="submit">merge pr</button>"#.to_string(),
            "</form>".to_string(),
            "</div>".to_string(),
        ]
        .join("\n")
    });

    std::iter::once("<h3>Open PRs</h3>".to_string())
        .chain(cards)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_error(context: &str, error: &WorkflowError) -> String {
    match error {
        WorkflowError::Unauthenticated => format!("<p>{}</p>", escape(&error.to_string())),
        _ => format!("<p>Error {}: {}</p>", context, escape(&error.to_string())),
    }
}
