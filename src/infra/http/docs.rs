//! HTTP surface for published documentation.

use std::{io::ErrorKind, sync::Arc};

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use metrics::counter;
use serde::Deserialize;
use tracing::error;

use crate::{
    application::error::HttpError,
    domain::{build::BuildRecord, layout},
    infra::{
        assets,
        store::{BuildStore, StoreError},
    },
};

use super::{
    middleware::{log_responses, set_request_context},
    theme,
};

#[derive(Clone)]
pub struct DocsState {
    pub store: Arc<BuildStore>,
}

pub fn build_router(state: DocsState) -> Router {
    Router::new()
        .route("/builds", get(list_builds))
        .route("/builds/{number}/docs", get(build_docs))
        .route("/builds/{number}/docs/{file}", get(build_artifact))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ThemeQuery {
    theme: Option<String>,
}

async fn list_builds(State(state): State<DocsState>) -> Result<Json<Vec<BuildRecord>>, HttpError> {
    const SOURCE: &str = "infra::http::docs::list_builds";

    state.store.list_records().await.map(Json).map_err(|err| {
        HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to list builds",
            &err,
        )
    })
}

/// Entry point for one build's documentation: the persisted record
/// decides which artifact the format published for this build maps to.
async fn build_docs(
    State(state): State<DocsState>,
    Path(number): Path<u32>,
    Query(query): Query<ThemeQuery>,
) -> Response {
    const SOURCE: &str = "infra::http::docs::build_docs";

    let record = match state.store.load_record(number).await {
        Ok(Some(record)) => record,
        Ok(None) => return not_published(SOURCE),
        Err(err) => return read_failure(SOURCE, number, layout::BUILD_RECORD_FILE, err),
    };

    let file = layout::artifact_file_name(record.format);
    serve_artifact(&state, number, file, &record, query.theme.as_deref()).await
}

async fn build_artifact(
    State(state): State<DocsState>,
    Path((number, file)): Path<(u32, String)>,
    Query(query): Query<ThemeQuery>,
) -> Response {
    const SOURCE: &str = "infra::http::docs::build_artifact";

    // Only the fixed artifact names are addressable; everything else in
    // the documentation directory (intermediate document, staged
    // sources, record) stays private.
    let known = [
        layout::HTML_ARTIFACT,
        layout::PDF_ARTIFACT,
        layout::ALL_ARTIFACT,
    ];
    if !known.contains(&file.as_str()) {
        return HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Documentation not found",
            format!("`{file}` is not a published artifact name"),
        )
        .into_response();
    }

    let record = match state.store.load_record(number).await {
        Ok(Some(record)) => record,
        Ok(None) => return not_published(SOURCE),
        Err(err) => return read_failure(SOURCE, number, layout::BUILD_RECORD_FILE, err),
    };

    serve_artifact(&state, number, &file, &record, query.theme.as_deref()).await
}

async fn serve_artifact(
    state: &DocsState,
    number: u32,
    file: &str,
    record: &BuildRecord,
    requested_theme: Option<&str>,
) -> Response {
    const SOURCE: &str = "infra::http::docs::serve_artifact";

    counter!("vivadoc_docs_requests_total", "artifact" => file.to_string()).increment(1);

    // The record decides which formats this build produced; the
    // aggregate page is addressable for any published build.
    let produced = match file {
        layout::HTML_ARTIFACT => record.has_html_docs(),
        layout::PDF_ARTIFACT => record.has_pdf_docs(),
        _ => true,
    };
    if !produced {
        return not_published(SOURCE);
    }

    // The aggregate page does not exist until its first request. The
    // record load above guarantees the documentation directory exists.
    if file == layout::ALL_ARTIFACT {
        if let Err(err) = state
            .store
            .materialize_all_page(number, assets::aggregate_page())
            .await
        {
            return read_failure(SOURCE, number, file, err);
        }
    }

    let bytes = match state.store.read_artifact(number, file).await {
        Ok(bytes) => bytes,
        Err(StoreError::Io(err)) if err.kind() == ErrorKind::NotFound => {
            return not_published(SOURCE);
        }
        Err(err) => return read_failure(SOURCE, number, file, err),
    };

    // Theme substitution targets the converter-produced page only; the
    // PDF and the aggregate landing page are served verbatim.
    let bytes = if file == layout::HTML_ARTIFACT {
        match themed_body(state, number, bytes, requested_theme).await {
            Ok(bytes) => bytes,
            Err(response) => return *response,
        }
    } else {
        bytes
    };

    artifact_response(file, bytes)
}

/// Resolve the theme rules: no `theme` parameter serves the artifact
/// verbatim, an empty value selects the default theme, and an unknown
/// name is a 404 rather than a silent fallback.
async fn themed_body(
    state: &DocsState,
    number: u32,
    html: Bytes,
    requested_theme: Option<&str>,
) -> Result<Bytes, Box<Response>> {
    const SOURCE: &str = "infra::http::docs::themed_body";

    let Some(raw_name) = requested_theme else {
        return Ok(html);
    };
    let name = if raw_name.is_empty() {
        layout::DEFAULT_THEME
    } else {
        raw_name
    };

    let css = match state.store.read_theme(number, name).await {
        Ok(css) => css,
        Err(StoreError::Io(err)) if err.kind() == ErrorKind::NotFound => {
            match assets::bundled_theme(name) {
                Some(css) => Bytes::from_static(css),
                None => {
                    return Err(Box::new(
                        HttpError::new(
                            SOURCE,
                            StatusCode::NOT_FOUND,
                            "Unknown theme",
                            format!("theme `{name}` is not available for build {number}"),
                        )
                        .into_response(),
                    ));
                }
            }
        }
        Err(StoreError::InvalidPath) => {
            return Err(Box::new(
                HttpError::new(
                    SOURCE,
                    StatusCode::NOT_FOUND,
                    "Unknown theme",
                    format!("`{name}` is not a valid theme name"),
                )
                .into_response(),
            ));
        }
        Err(err) => {
            return Err(Box::new(read_failure(SOURCE, number, "theme", err)));
        }
    };

    let page = String::from_utf8_lossy(&html);
    let css = String::from_utf8_lossy(&css);
    match theme::apply_theme(&page, &css) {
        Ok(themed) => Ok(Bytes::from(themed)),
        Err(err) => {
            error!(
                target = SOURCE,
                build_number = number,
                theme = name,
                error = %err,
                "theme substitution failed"
            );
            Err(Box::new(
                HttpError::new(
                    SOURCE,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Theme substitution failed",
                    err.to_string(),
                )
                .into_response(),
            ))
        }
    }
}

/// Content type follows the artifact's file extension alone; artifact
/// bytes are never sniffed.
fn artifact_response(file: &str, bytes: Bytes) -> Response {
    let mime = mime_guess::from_path(file).first_or_octet_stream();
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(CONTENT_DISPOSITION, HeaderValue::from_static("inline"));

    response
}

fn not_published(source: &'static str) -> Response {
    HttpError::new(
        source,
        StatusCode::NOT_FOUND,
        "Documentation not found",
        "This build has no published documentation",
    )
    .into_response()
}

fn read_failure(source: &'static str, number: u32, file: &str, err: StoreError) -> Response {
    error!(
        target = source,
        build_number = number,
        file = file,
        error = %err,
        "failed to read documentation artifact"
    );
    HttpError::from_error(
        source,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to read documentation",
        &err,
    )
    .into_response()
}
