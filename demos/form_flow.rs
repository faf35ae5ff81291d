//! Form round trip with session-scoped tokens.
//!
//! Run with: cargo run --example form_flow

use forgeguard::prelude::*;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    LogConfig::new()
        .format(LogFormat::Pretty)
        .with_env_filter("forgeguard_csrf=debug,info")
        .try_init()?;

    let csrf = Arc::new(CsrfProtection::new(CsrfConfig::session())?);
    let sessions = SessionMiddleware::new(
        Arc::new(MemorySessionStore::new()),
        SessionConfig::default(),
    )?;

    let chain = MiddlewareChain::new()
        .with(CookieParser)
        .with(sessions)
        .with(csrf.issuer())
        .with(csrf.exposer())
        .with(csrf.validator());

    let render = handler(|req: HttpRequest| async move {
        let token = csrf_token(&req).unwrap_or_default();
        Ok(HttpResponse::text(
            200,
            format!("<input type=\"hidden\" name=\"_csrf\" value=\"{token}\">"),
        ))
    });

    let form = chain
        .apply(HttpRequest::new("GET", "/transfer"), render.clone())
        .await?;
    println!("GET /transfer -> {} {}", form.status, form.body_text());

    let session_cookie = form
        .cookies
        .first()
        .and_then(|c| c.split(';').next())
        .unwrap_or_default()
        .to_string();
    let token = form
        .body_text()
        .split("value=\"")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .unwrap_or_default()
        .to_string();

    let forged = HttpRequest::new("POST", "/transfer").with_header("Cookie", &session_cookie);
    let response = chain.apply(forged, render.clone()).await?;
    println!("POST without token -> {} {}", response.status, response.body_text());

    let submit = HttpRequest::new("POST", "/transfer")
        .with_header("Cookie", &session_cookie)
        .with_form(&[("_csrf", token.as_str())])?;
    let response = chain.apply(submit.clone(), render.clone()).await?;
    println!("POST with token -> {}", response.status);

    let response = chain.apply(submit, render).await?;
    println!("POST replayed -> {} {}", response.status, response.body_text());

    Ok(())
}
