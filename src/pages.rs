// Server-rendered pages: console shell, auth error page, unauthorized page
//
// Dashboards themselves are drawn by the console shell in the browser; these
// pages only cover what must work before or without a signed-in session.

use std::path::Path;

use axum::response::Html;

use crate::auth::{AuthErrorCode, Remediation};

/// Minimal HTML escaping for text and attribute values
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn layout(title: &str, head_extra: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n{head_extra}</head>\n<body>\n<main class=\"console-message\">\n{body}\n</main>\n</body>\n</html>\n",
        title = escape(title),
    ))
}

fn login_link(return_to: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("returnTo", return_to)
        .finish();
    format!("/auth/login?{}", query)
}

pub fn error_page(code: AuthErrorCode, return_to: &str, support_email: &str) -> Html<String> {
    let action = match code.remediation() {
        Remediation::RetrySignIn => format!(
            "<a class=\"button\" href=\"{}\">Sign in again</a>",
            escape(&login_link(return_to))
        ),
        Remediation::ContactSupport => format!(
            "<a class=\"button\" href=\"mailto:{email}\">Contact support</a>\n\
             <a href=\"{login}\">Use a different account</a>",
            email = escape(support_email),
            login = escape(&login_link(return_to)),
        ),
    };

    layout(
        code.title(),
        "",
        &format!(
            "<h1>{title}</h1>\n<p>{message}</p>\n<p class=\"error-code\">Error code: {code}</p>\n{action}",
            title = escape(code.title()),
            message = escape(code.message()),
            code = escape(code.as_str()),
        ),
    )
}

pub fn unauthorized_page(home: Option<&str>) -> Html<String> {
    let action = match home {
        Some(home) => format!("<a class=\"button\" href=\"{}\">Go to your dashboard</a>", escape(home)),
        None => "<a class=\"button\" href=\"/auth/login\">Sign in</a>".to_string(),
    };
    layout(
        "Not authorized",
        "",
        &format!(
            "<h1>You don't have access to this page</h1>\n\
             <p>Your role in this organization doesn't include this area of the console.</p>\n{}",
            action
        ),
    )
}

/// Shown while another request of the same session finishes the callback.
/// Refreshes until the gate decides; a stalled sign-in is abandoned after the
/// sign-in timeout, so the refresh is bounded.
pub fn signing_in_page(return_to: &str) -> Html<String> {
    layout(
        "Signing in",
        "<meta http-equiv=\"refresh\" content=\"2\">\n",
        &format!(
            "<h1>Signing you in&hellip;</h1>\n\
             <p>Taking too long? <a href=\"{}\">Sign in again</a></p>",
            escape(&login_link(return_to))
        ),
    )
}

pub fn tenant_not_found_page(support_email: &str) -> Html<String> {
    error_page(AuthErrorCode::TenantNotFound, "/", support_email)
}

const FALLBACK_SHELL: &str = "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n<title>Console</title>\n\
<script type=\"module\" src=\"/assets/index.js\"></script>\n</head>\n<body>\n<div id=\"root\"></div>\n</body>\n</html>\n";

/// The console single-page shell: `index.html` from the static directory when present
pub async fn console_shell(static_dir: Option<&str>) -> Html<String> {
    if let Some(dir) = static_dir {
        let index = Path::new(dir).join("index.html");
        match tokio::fs::read_to_string(&index).await {
            Ok(html) => return Html(html),
            Err(e) => tracing::warn!("Console shell {} unavailable: {}", index.display(), e),
        }
    }
    Html(FALLBACK_SHELL.to_string())
}
