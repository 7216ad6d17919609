//! Demo API: a handful of endpoints for poking at the server by hand.
//!
//! | Route | Behavior |
//! |-------|----------|
//! | `GET /resp_test?code=N` | bare response with status N |
//! | `GET /delay_test?delay=S` | sleep S seconds, then answer |
//! | `GET /hello`, `GET /hello/nested` | echo subdir and query params |
//! | `POST /echo` | echo the request body |
//! | `GET /` | static files, or a placeholder page |

use std::collections::BTreeMap;
use std::time::Duration;

use crate::http::{HttpError, HttpResponse, Status};
use crate::routing::{HandlerResult, RequestContext, Router};
use crate::static_files::StaticFiles;

/// Longest sleep `/delay_test` agrees to.
pub const MAX_DELAY_SECS: f64 = 60.0;

const DELAY_FALLBACK: &str = "/delay_test?delay=2";

pub const PLACEHOLDER_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Placeholder Page</title>
</head>
<body>
    <h1>No index.html found!</h1>
</body>
</html>
"#;

/// Router with every demo endpoint registered, serving `files` under `/`.
pub fn demo_router(files: StaticFiles) -> Router {
    Router::new()
        .get("/resp_test", resp_test)
        .get("/delay_test", delay_test)
        .get("/hello", hello)
        .get("/hello/nested", hello_nested)
        .post("/echo", echo)
        .get("/", move |ctx: RequestContext| {
            let files = files.clone();
            async move { index(files, ctx).await }
        })
}

async fn resp_test(ctx: RequestContext) -> HandlerResult {
    if !ctx.subdir.is_empty() {
        return Err(HttpError::new(Status::NOT_FOUND).into());
    }

    let status = ctx
        .param("code")
        .and_then(|code| code.parse::<u16>().ok())
        .and_then(Status::from_code)
        .ok_or(HttpError::new(Status::BAD_REQUEST))?;

    Ok(HttpResponse::new(status))
}

async fn delay_test(ctx: RequestContext) -> HandlerResult {
    if !ctx.subdir.is_empty() {
        return Ok(HttpResponse::redirect(DELAY_FALLBACK));
    }

    let raw = ctx.param("delay").unwrap_or("0");
    let delay = match raw.parse::<f64>() {
        Ok(secs) if secs > 0.0 && secs <= MAX_DELAY_SECS => secs,
        _ => return Ok(HttpResponse::redirect(DELAY_FALLBACK)),
    };

    tokio::time::sleep(Duration::from_secs_f64(delay)).await;
    Ok(HttpResponse::text(format!("{}s wait done", raw)))
}

async fn hello(ctx: RequestContext) -> HandlerResult {
    greet("Hello, world!", &ctx)
}

async fn hello_nested(ctx: RequestContext) -> HandlerResult {
    greet("(Hello, world!)^2", &ctx)
}

fn greet(greeting: &str, ctx: &RequestContext) -> HandlerResult {
    let params: BTreeMap<&str, &str> = ctx
        .params()
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();

    Ok(HttpResponse::text(format!(
        "{}\nsubdir: {}\nparams:{}",
        greeting,
        ctx.subdir,
        serde_json::to_string(&params)?
    )))
}

async fn echo(ctx: RequestContext) -> HandlerResult {
    let body = ctx.body().to_vec();
    Ok(match ctx.request.headers.get("content-type") {
        Some(content_type) => HttpResponse::file(content_type, body),
        None => HttpResponse::octet_stream(body),
    })
}

async fn index(files: StaticFiles, ctx: RequestContext) -> HandlerResult {
    if ctx.subdir.is_empty() && !files.listing() && !files.has_index().await {
        return Ok(HttpResponse::html(PLACEHOLDER_HTML));
    }
    Ok(files.serve(&ctx.subdir).await)
}
