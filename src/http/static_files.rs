//! GET requests: files under the handler root and the root page.

use std::borrow::Cow;
use std::path::Path;

use axum::http::StatusCode;

use crate::config::ServerConfig;
use crate::error::DispatchError;
use crate::response::ResponseEnvelope;
use crate::routing::path::{has_traversal, map_under_root, segments};

/// Served at `/` when the root has no index file.
const LANDING_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>treeserve</title></head>
<body style="font-family: system-ui, sans-serif; max-width: 40rem; margin: 4rem auto;">
<h1>treeserve</h1>
<p>Handlers are resolved from the files under this server's handler root.</p>
<ul>
  <li><a href="/__api/docs">API documentation</a></li>
  <li><a href="/__api/spec.json">API description (JSON)</a></li>
</ul>
</body>
</html>
"#;

/// Serve the file behind `raw_path`.
pub async fn serve(config: &ServerConfig, raw_path: &str) -> Result<ResponseEnvelope, DispatchError> {
    let path = urlencoding::decode(raw_path).unwrap_or(Cow::Borrowed(raw_path));
    if has_traversal(&path) {
        return Err(DispatchError::Traversal(path.into_owned()));
    }

    let root = &config.handlers.root;
    let index_file = &config.static_files.index_file;
    let not_found = || DispatchError::FileNotFound(path.to_string());

    if segments(&path).is_empty() {
        let index = root.join(index_file);
        if config.static_files.enabled && is_file(&index).await {
            return read_file(&index).await;
        }
        return Ok(ResponseEnvelope::html(StatusCode::OK, LANDING_PAGE));
    }

    if !config.static_files.enabled || segments(&path).iter().any(|s| s.starts_with('.')) {
        return Err(not_found());
    }

    let mut file = map_under_root(root, &path).ok_or_else(not_found)?;
    if is_dir(&file).await {
        file.push(index_file);
    }

    let is_handler_source = file
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == config.handlers.extension);
    if is_handler_source || !is_file(&file).await {
        return Err(not_found());
    }

    read_file(&file).await
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|meta| meta.is_file())
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|meta| meta.is_dir())
}

async fn read_file(path: &Path) -> Result<ResponseEnvelope, DispatchError> {
    let bytes = tokio::fs::read(path).await.map_err(|err| {
        tracing::warn!(path = %path.display(), error = %err, "Failed to read static file");
        DispatchError::FileRead(err.to_string())
    })?;
    Ok(ResponseEnvelope::new(StatusCode::OK).with_body(bytes, content_type(path)))
}

/// Content type by file extension.
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" | "md" => "text/plain; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "wasm" => "application/wasm",
        "pdf" => "application/pdf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}
