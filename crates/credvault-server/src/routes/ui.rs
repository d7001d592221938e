//! Unauthenticated pages: landing page, health check and robots.txt.
//!
//! The browser client is deployed separately and talks to the JSON API;
//! `/` only explains where that API lives.

use std::sync::Arc;

use axum::Router;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::routing::get;

use crate::state::AppState;

/// Paths crawlers are asked to skip.
const ROBOTS_TXT: &str = "User-agent: *\n\
Disallow: /admin/\n\
Disallow: /api/\n\
Disallow: /auth/\n\
Disallow: /media/private/";

/// Build the UI router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(landing_page))
        .route("/health/", get(health_check))
        .route("/robots.txt", get(robots_txt))
}

async fn landing_page() -> Html<&'static str> {
    Html(LANDING_HTML)
}

/// Liveness probe for load balancers.
async fn health_check() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], "OK")
}

async fn robots_txt() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], ROBOTS_TXT)
}

const LANDING_HTML: &str = r##"<!DOCTYPE html>
<html lang="en"><head><meta charset="utf-8"/><meta name="viewport" content="width=device-width,initial-scale=1"/>
<title>Credentials Manager</title>
<style>
*,*::before,*::after{box-sizing:border-box;margin:0;padding:0}
:root{--bg:#101820;--text:#E6EEF5;--text-muted:#8DA2B5;--primary:#3FA7F5;--glass:rgba(255,255,255,.04);--glass-border:rgba(255,255,255,.08)}
body{font-family:-apple-system,'Segoe UI',sans-serif;background:var(--bg);color:var(--text);line-height:1.6}
.hero{text-align:center;max-width:760px;margin:0 auto;padding:120px 24px 60px}
.hero h1{font-size:52px;font-weight:800;letter-spacing:-2px;margin-bottom:20px}
.hero h1 span{color:var(--primary)}
.hero p{font-size:18px;color:var(--text-muted);margin-bottom:32px}
.features{max-width:1000px;margin:0 auto;padding:24px;display:grid;grid-template-columns:repeat(3,1fr);gap:18px}
.feature{background:var(--glass);border:1px solid var(--glass-border);border-radius:16px;padding:28px}
.feature h3{font-size:16px;margin-bottom:8px}
.feature p{font-size:14px;color:var(--text-muted)}
code{background:rgba(255,255,255,.06);padding:2px 6px;border-radius:6px}
.footer{max-width:1000px;margin:40px auto 0;padding:24px;font-size:13px;color:#56687A;border-top:1px solid var(--glass-border)}
@media(max-width:768px){.hero h1{font-size:34px}.features{grid-template-columns:1fr}}
</style></head>
<body>
<section class="hero">
  <h1>Your passwords, <span>encrypted</span></h1>
  <p>Store logins, API keys and private notes. Secrets are encrypted field by field before they touch disk, and only you can read yours.</p>
  <p>Register with <code>POST /auth/register</code>, then use the API under <code>/api/</code>.</p>
</section>
<section class="features">
  <div class="feature"><h3>Field encryption</h3><p>Passwords, secret keys and note bodies are sealed with AES-256-GCM.</p></div>
  <div class="feature"><h3>Search and favorites</h3><p>Find anything by label, username, website or tag. Pin what you use most.</p></div>
  <div class="feature"><h3>Activity log</h3><p>Every login, view and change is recorded with the client address.</p></div>
</section>
<footer class="footer">Credentials Manager v0.1.0</footer>
</body></html>
"##;
