use std::fmt::Write as _;

use client_sdk::StoreApi;
use common::StoreEngine;
use dashboard::{Dashboard, StatusMessage, StoreRow, Tone};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

const ERROR_COLOR: &str = "#b00020";
const INFO_COLOR: &str = "#007700";

/// Everything outside the RFC 3986 unreserved set.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Render the whole dashboard page for the dashboard's current state.
pub fn app_html<A: StoreApi>(dashboard: &Dashboard<A>, api_base_url: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Store Provisioning Dashboard</title>
    <style>
        body {{ font-family: system-ui, sans-serif; margin: 1.5rem; background: #fafafa; }}
        main {{ max-width: 1100px; margin: 0 auto; }}
        section {{ background: #fff; border: 1px solid #ddd; border-radius: 8px; padding: 1rem; margin-bottom: 1rem; }}
        h1, h2 {{ margin-top: 0; }}
        label {{ display: block; margin: 0.4rem 0 0.2rem; font-weight: 600; }}
        input, select, button {{ font: inherit; }}
        input, select {{ padding: 0.5rem; border: 1px solid #ccc; border-radius: 6px; }}
        .actions {{ margin-top: 0.6rem; display: flex; gap: 0.5rem; flex-wrap: wrap; align-items: end; }}
        button, .button {{ padding: 0.5rem 0.8rem; border: 1px solid #888; border-radius: 6px; background: #f5f5f5; cursor: pointer; color: inherit; text-decoration: none; }}
        table {{ width: 100%; border-collapse: collapse; }}
        th, td {{ text-align: left; padding: 0.45rem; border-bottom: 1px solid #eee; }}
        td form {{ margin: 0; }}
        .status-ready {{ color: #007700; font-weight: 600; }}
        .status-failed {{ color: #b00020; font-weight: 600; }}
        .status-provisioning {{ color: #a36b00; font-weight: 600; }}
        .muted {{ color: #666; font-size: 0.92rem; }}
        #message {{ min-height: 1.4rem; }}
    </style>
</head>
<body>
    <main>
        <h1>Store Provisioning Dashboard</h1>
        <p class="muted">API: <code>{api}</code></p>

        <section>
            <h2>Create store</h2>
            <form method="post" action="/stores" class="actions">
                <div>
                    <label for="storeName">Store name</label>
                    <input id="storeName" name="name" placeholder="store-demo" value="{name_draft}" />
                </div>
                <div>
                    <label for="engine">Engine</label>
                    <select id="engine" name="engine">
{engine_options}                    </select>
                </div>
                <button id="createBtn" type="submit">Create</button>
                <a id="refreshBtn" class="button" href="/">Refresh</a>
            </form>
            {message}
        </section>

        <section>
            <h2>Stores</h2>
            <table>
                <thead>
                    <tr><th>Name</th><th>Engine</th><th>Status</th><th>URL</th><th>Created</th><th></th></tr>
                </thead>
                <tbody id="storeRows">
{rows}                </tbody>
            </table>
        </section>
    </main>
</body>
</html>
"#,
        api = escape_html(api_base_url),
        name_draft = escape_html(dashboard.name_draft()),
        engine_options = render_engine_options(dashboard.engine()),
        message = render_message(dashboard.message()),
        rows = render_rows(dashboard.rows()),
    )
}

pub fn render_rows(rows: &[StoreRow]) -> String {
    let mut html = String::new();
    for row in rows {
        let name = escape_html(&row.name);
        let url = escape_html(&row.url);
        let _ = writeln!(
            html,
            r#"                    <tr>
                        <td>{name}</td>
                        <td>{engine}</td>
                        <td class="{class}">{status}</td>
                        <td><a href="{url}" target="_blank">{url}</a></td>
                        <td>{created_at}</td>
                        <td><form method="post" action="/stores/{path}/delete"><button type="submit" data-name="{name}">Delete</button></form></td>
                    </tr>"#,
            engine = escape_html(&row.engine),
            class = row.status_class,
            status = escape_html(&row.status),
            created_at = escape_html(&row.created_at),
            path = encode_path_segment(&row.name),
        );
    }
    html
}

pub fn render_message(message: Option<&StatusMessage>) -> String {
    match message {
        Some(message) => {
            let color = match message.tone {
                Tone::Error => ERROR_COLOR,
                Tone::Info => INFO_COLOR,
            };
            format!(
                r#"<p id="message" style="color: {color}">{}</p>"#,
                escape_html(&message.text)
            )
        }
        None => r#"<p id="message"></p>"#.to_string(),
    }
}

fn render_engine_options(selected: StoreEngine) -> String {
    let mut html = String::new();
    for engine in StoreEngine::ALL {
        let marker = if engine == selected { " selected" } else { "" };
        let _ = writeln!(
            html,
            r#"                        <option value="{engine}"{marker}>{engine}</option>"#
        );
    }
    html
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn encode_path_segment(raw: &str) -> String {
    utf8_percent_encode(raw, PATH_SEGMENT).to_string()
}
