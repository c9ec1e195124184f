use std::sync::Arc;
use std::time::Duration;

use axum::{Json, extract::State};
use serde_json::json;
use tracing::info;

use crate::error::{GatewayError, Result};
use crate::models::{ScrapeRequest, ScrapeResponse};
use crate::retry::{FetchRequest, fetch_with_retry};
use crate::state::AppState;

const SCRAPE_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn scrape_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ScrapeRequest>,
) -> Result<Json<ScrapeResponse>> {
    let url = payload.url.trim();
    if url.is_empty() {
        return Err(GatewayError::InvalidInput("url is required".into()));
    }

    if let Some(entry) = state.scrape_cache.get(url) {
        return Ok(Json(ScrapeResponse {
            cached: true,
            entry,
        }));
    }

    // add https:// if not present
    let target = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    };

    let request = FetchRequest::get(&target)
        .header("accept", "text/html")
        .timeout(SCRAPE_TIMEOUT);
    let response = fetch_with_retry(state.transport.as_ref(), &request, &state.retry).await?;
    if !response.is_success() {
        return Err(GatewayError::Status {
            status: response.status,
            body: format!("fetching {target} failed"),
        });
    }

    let html = response.text();
    let content = visible_text(&html);
    let metadata = json!({
        "title": extract_title(&html),
        "status": response.status,
        "content_type": response.header("content-type"),
        "html_bytes": html.len(),
        "fetched_from": target,
    });
    info!(url, chars = content.len(), "scraped website");

    let entry = state
        .scrape_cache
        .set(url, content, metadata, None, Some("fetch".into()));
    Ok(Json(ScrapeResponse {
        cached: false,
        entry,
    }))
}

fn extract_title(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let open = lower.find("<title")?;
    let start = open + lower[open..].find('>')? + 1;
    let end = start + lower[start..].find("</title>")?;
    let title = collapse_whitespace(&html[start..end]);
    (!title.is_empty()).then_some(title)
}

// Strip tags, drop script/style bodies, collapse whitespace
fn visible_text(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len() / 2);
    let mut i = 0;

    while i < html.len() {
        let rest = &lower[i..];
        if rest.starts_with("<script") || rest.starts_with("<style") {
            let close = if rest.starts_with("<script") { "</script>" } else { "</style>" };
            i += rest.find(close).map_or(rest.len(), |p| p + close.len());
            out.push(' ');
        } else if rest.starts_with('<') {
            i += rest.find('>').map_or(rest.len(), |p| p + 1);
            out.push(' ');
        } else {
            let next = rest.find('<').unwrap_or(rest.len());
            out.push_str(&html[i..i + next]);
            i += next;
        }
    }

    collapse_whitespace(&out)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
