//! HTTP server for interactive analysis mode
//!
//! `verisight serve` → starts server, opens browser, accepts uploads
//!
//! Uploads are sent as the raw request body with the modality and file name
//! in the query string, so the server never has to parse multipart forms.

use crate::analyzer::{collect_files, FileAnalysis, Modality, ModalityResult};
use crate::db::{Database, DbError, StoredAnalysis};
use crate::report::{self, html::CertificateRecord, Summary};
use crate::Analyzer;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::PathBuf;
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{info, warn};

// Embed the UI directly in the binary
const UI_HTML: &str = include_str!("ui.html");

/// Uploads larger than this are rejected
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Serialize)]
struct ApiResponse<T> {
    ok: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self { ok: true, data: Some(data), error: None }
    }
}

impl ApiResponse<()> {
    fn failure(error: impl Into<String>) -> Self {
        Self { ok: false, data: None, error: Some(error.into()) }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct UploadParams {
    #[serde(rename = "type")]
    pub modality: Option<String>,
    pub name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct AnalyzeParams {
    pub path: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct ListParams {
    pub limit: Option<i64>,
}

/// A stored verdict as the API returns it: row metadata plus the result
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisView {
    pub id: i32,
    pub file_name: String,
    pub file_type: String,
    pub analyzed_at: String,
    #[serde(flatten)]
    pub result: ModalityResult,
}

impl AnalysisView {
    fn from_stored(stored: &StoredAnalysis) -> Result<Self, DbError> {
        Ok(Self {
            id: stored.id,
            file_name: stored.file_name.clone(),
            file_type: stored.file_type.clone(),
            analyzed_at: stored.analyzed_at.clone(),
            result: stored.to_result()?,
        })
    }
}

#[derive(Serialize)]
pub struct AnalysisReport {
    pub generated: String,
    pub summary: Summary,
    pub files: Vec<FileAnalysis>,
}

#[derive(Serialize)]
struct Deleted {
    id: i32,
    deleted: bool,
}

/// Response before it is bound to a tiny_http request
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self { status, content_type: "application/json", body },
            Err(e) => Self::text(500, format!("serialization failed: {}", e)),
        }
    }

    fn ok<T: Serialize>(data: T) -> Self {
        Self::json(200, &ApiResponse::success(data))
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, &ApiResponse::failure(message))
    }

    fn html(body: String) -> Self {
        Self { status: 200, content_type: "text/html; charset=utf-8", body: body.into_bytes() }
    }

    fn text(status: u16, body: String) -> Self {
        Self { status, content_type: "text/plain; charset=utf-8", body: body.into_bytes() }
    }
}

impl From<DbError> for Reply {
    fn from(e: DbError) -> Self {
        warn!(error = %e, "database request failed");
        Reply::error(500, e.to_string())
    }
}

/// Shared state for every request
pub struct AppState {
    pub analyzer: Analyzer,
    pub db: Database,
}

/// Start server, open browser, serve UI
pub fn start(port: u16, state: AppState, open_browser: bool) -> std::io::Result<()> {
    let addr = format!("127.0.0.1:{}", port);
    let server = Server::http(&addr).map_err(|e| std::io::Error::other(e.to_string()))?;

    let url = format!("http://localhost:{}", port);

    eprintln!("\n\x1b[1;32mVerisight\x1b[0m");
    eprintln!("   {}\n", url);
    info!(%addr, "server listening");

    if open_browser {
        let _ = open::that(&url);
    }

    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &state) {
            warn!(error = %e, "request failed");
        }
    }

    Ok(())
}

fn handle_request(mut request: Request, state: &AppState) -> std::io::Result<()> {
    let url = request.url().to_string();
    let method = request.method().clone();

    let mut body = Vec::new();
    if method == Method::Post {
        request
            .as_reader()
            .take(MAX_UPLOAD_BYTES + 1)
            .read_to_end(&mut body)?;
    }

    let reply = if body.len() as u64 > MAX_UPLOAD_BYTES {
        Reply::error(413, "upload too large")
    } else {
        route(state, &method, &url, &body)
    };
    info!(method = %method, %url, status = reply.status, "request");

    let mut response = Response::from_data(reply.body).with_status_code(reply.status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
        response.add_header(header);
    }
    request.respond(response)
}

/// Dispatch one request. Pure apart from the database.
pub fn route(state: &AppState, method: &Method, url: &str, body: &[u8]) -> Reply {
    let mut parts = url.splitn(2, '?');
    let path = parts.next().unwrap_or("/");
    let query = parts.next().unwrap_or("");
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    match (method, segments.as_slice()) {
        (&Method::Get, [""]) => Reply::html(UI_HTML.to_string()),

        (&Method::Post, ["api", "analysis", "upload"]) => upload(state, query, body),

        (&Method::Get, ["api", "analysis"]) => {
            let params: ListParams = serde_urlencoded::from_str(query).unwrap_or_default();
            list(state, params.limit)
        }

        (&Method::Get, ["api", "analysis", "certificate", id]) => match id.parse() {
            Ok(id) => certificate(state, id),
            Err(_) => Reply::error(400, format!("invalid id: {}", id)),
        },

        (&Method::Get, ["api", "analysis", id]) => match id.parse() {
            Ok(id) => show(state, id),
            Err(_) => Reply::error(400, format!("invalid id: {}", id)),
        },

        (&Method::Delete, ["api", "analysis", id]) => match id.parse() {
            Ok(id) => delete(state, id),
            Err(_) => Reply::error(400, format!("invalid id: {}", id)),
        },

        (&Method::Get, ["api", "summary"]) => match state.db.get_summary() {
            Ok(summary) => Reply::ok(summary),
            Err(e) => e.into(),
        },

        (&Method::Get, ["api", "analyze"]) => match serde_urlencoded::from_str::<AnalyzeParams>(query) {
            Ok(params) => Reply::ok(run_analysis(&state.analyzer, &params)),
            Err(e) => Reply::error(400, format!("bad query: {}", e)),
        },

        _ => Reply::error(404, "Not found"),
    }
}

fn upload(state: &AppState, query: &str, body: &[u8]) -> Reply {
    let params: UploadParams = match serde_urlencoded::from_str(query) {
        Ok(p) => p,
        Err(e) => return Reply::error(400, format!("bad query: {}", e)),
    };
    let file_name = params.name.unwrap_or_else(|| "upload".to_string());

    // Explicit type wins; otherwise trust the file name
    let modality = match params.modality.as_deref() {
        Some(tag) => match Modality::from_tag(tag) {
            Some(m) => m,
            None => return Reply::error(400, format!("unknown type: {}", tag)),
        },
        None => match Modality::from_path(&file_name) {
            Some(m) => m,
            None => return Reply::error(400, "missing type"),
        },
    };

    let result = state.analyzer.analyze(modality, body);
    info!(file = %file_name, %modality, label = %result.authenticity_label, "analyzed upload");

    let analysis = FileAnalysis {
        file_path: file_name.clone(),
        file_name,
        modality: Some(modality),
        result,
    };

    let stored = state
        .db
        .insert_result(&analysis)
        .and_then(|id| state.db.get_result(id));
    match stored {
        Ok(Some(record)) => match AnalysisView::from_stored(&record) {
            Ok(view) => Reply::ok(view),
            Err(e) => e.into(),
        },
        Ok(None) => Reply::error(500, "stored result vanished"),
        Err(e) => e.into(),
    }
}

fn list(state: &AppState, limit: Option<i64>) -> Reply {
    match state.db.list_results(limit) {
        Ok(records) => {
            let views: Vec<AnalysisView> = records
                .iter()
                .filter_map(|r| match AnalysisView::from_stored(r) {
                    Ok(v) => Some(v),
                    Err(e) => {
                        warn!(id = r.id, error = %e, "skipping unreadable record");
                        None
                    }
                })
                .collect();
            Reply::ok(views)
        }
        Err(e) => e.into(),
    }
}

fn show(state: &AppState, id: i32) -> Reply {
    match state.db.get_result(id) {
        Ok(Some(record)) => match AnalysisView::from_stored(&record) {
            Ok(view) => Reply::ok(view),
            Err(e) => e.into(),
        },
        Ok(None) => Reply::error(404, format!("no analysis {}", id)),
        Err(e) => e.into(),
    }
}

fn delete(state: &AppState, id: i32) -> Reply {
    match state.db.delete_result(id) {
        Ok(true) => Reply::ok(Deleted { id, deleted: true }),
        Ok(false) => Reply::error(404, format!("no analysis {}", id)),
        Err(e) => e.into(),
    }
}

fn certificate(state: &AppState, id: i32) -> Reply {
    let record: CertificateRecord = match state.db.get_result(id) {
        Ok(Some(stored)) => match stored.to_certificate() {
            Ok(c) => c,
            Err(e) => return e.into(),
        },
        Ok(None) => return Reply::text(404, "Not Found".to_string()),
        Err(e) => return e.into(),
    };

    let mut page = Vec::new();
    match report::html::write_certificate(&mut page, &record) {
        Ok(()) => Reply { status: 200, content_type: "text/html; charset=utf-8", body: page },
        Err(e) => Reply::text(500, format!("render failed: {}", e)),
    }
}

/// Analyze a local file or folder in parallel without storing anything
fn run_analysis(analyzer: &Analyzer, params: &AnalyzeParams) -> AnalysisReport {
    let files = collect_files(PathBuf::from(&params.path));
    let results: Vec<FileAnalysis> = files.par_iter().map(|p| analyzer.analyze_path(p)).collect();
    let summary = Summary::from_results(&results);

    AnalysisReport {
        generated: chrono::Local::now().to_rfc3339(),
        summary,
        files: results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ESSAY: &str = "I missed the bus again this morning! Typical. The driver waved, \
        I think, but he did not stop, so I walked the whole way in the rain and arrived \
        soaked. Still, the coffee at work was good. Tomorrow I leave early.";

    fn state() -> (TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(dir.path().join("serve.db")).unwrap();
        (dir, AppState { analyzer: Analyzer::new(), db })
    }

    fn json(reply: &Reply) -> serde_json::Value {
        assert_eq!(reply.content_type, "application/json");
        serde_json::from_slice(&reply.body).unwrap()
    }

    fn upload_text(state: &AppState) -> i64 {
        let reply = route(
            state,
            &Method::Post,
            "/api/analysis/upload?type=text&name=essay.txt",
            ESSAY.as_bytes(),
        );
        assert_eq!(reply.status, 200);
        json(&reply)["data"]["id"].as_i64().unwrap()
    }

    // ==========================================================================
    // ROUTING TESTS
    // ==========================================================================

    #[test]
    fn test_index_serves_ui() {
        let (_dir, state) = state();
        let reply = route(&state, &Method::Get, "/", &[]);
        assert_eq!(reply.status, 200);
        assert!(reply.content_type.starts_with("text/html"));
        assert!(String::from_utf8(reply.body).unwrap().contains("/api/analysis/upload"));
    }

    #[test]
    fn test_unknown_route_is_404() {
        let (_dir, state) = state();
        let reply = route(&state, &Method::Get, "/nope", &[]);
        assert_eq!(reply.status, 404);
        let v = json(&reply);
        assert_eq!(v["ok"], false);
        assert_eq!(v["error"], "Not found");
    }

    // ==========================================================================
    // UPLOAD TESTS
    // ==========================================================================

    #[test]
    fn test_upload_text_returns_stored_record() {
        let (_dir, state) = state();
        let reply = route(
            &state,
            &Method::Post,
            "/api/analysis/upload?type=text&name=essay.txt",
            ESSAY.as_bytes(),
        );
        let v = json(&reply);
        assert_eq!(v["ok"], true);
        assert_eq!(v["data"]["fileName"], "essay.txt");
        assert_eq!(v["data"]["fileType"], "text");
        assert_eq!(v["data"]["authenticityLabel"], "Likely Organic");
        assert_eq!(v["data"]["checks"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_upload_infers_type_from_name() {
        let (_dir, state) = state();
        let reply = route(&state, &Method::Post, "/api/analysis/upload?name=notes.txt", b"Hello.");
        assert_eq!(json(&reply)["data"]["fileType"], "text");
    }

    #[test]
    fn test_upload_rejects_unknown_type() {
        let (_dir, state) = state();
        let reply = route(&state, &Method::Post, "/api/analysis/upload?type=video", b"x");
        assert_eq!(reply.status, 400);
        assert_eq!(json(&reply)["error"], "unknown type: video");

        let reply = route(&state, &Method::Post, "/api/analysis/upload?name=blob.bin", b"x");
        assert_eq!(reply.status, 400);
    }

    #[test]
    fn test_garbage_image_is_stored_as_error() {
        let (_dir, state) = state();
        let reply = route(
            &state,
            &Method::Post,
            "/api/analysis/upload?type=image&name=bad.png",
            b"definitely not a png",
        );
        let v = json(&reply);
        assert_eq!(v["ok"], true);
        assert_eq!(v["data"]["authenticityLabel"], "Error");
        assert!(v["data"]["reasoning"].as_str().unwrap().starts_with("Analysis failed: "));
    }

    // ==========================================================================
    // HISTORY TESTS
    // ==========================================================================

    #[test]
    fn test_list_show_delete() {
        let (_dir, state) = state();
        let first = upload_text(&state);
        let second = upload_text(&state);

        let v = json(&route(&state, &Method::Get, "/api/analysis", &[]));
        let ids: Vec<i64> = v["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![second, first]);

        let v = json(&route(&state, &Method::Get, "/api/analysis?limit=1", &[]));
        assert_eq!(v["data"].as_array().unwrap().len(), 1);

        let v = json(&route(&state, &Method::Get, &format!("/api/analysis/{}", first), &[]));
        assert_eq!(v["data"]["id"], first);

        let reply = route(&state, &Method::Delete, &format!("/api/analysis/{}", first), &[]);
        assert_eq!(json(&reply)["data"]["deleted"], true);

        let reply = route(&state, &Method::Get, &format!("/api/analysis/{}", first), &[]);
        assert_eq!(reply.status, 404);
        let reply = route(&state, &Method::Delete, &format!("/api/analysis/{}", first), &[]);
        assert_eq!(reply.status, 404);
    }

    #[test]
    fn test_bad_id_is_400() {
        let (_dir, state) = state();
        let reply = route(&state, &Method::Get, "/api/analysis/abc", &[]);
        assert_eq!(reply.status, 400);
    }

    #[test]
    fn test_certificate_page() {
        let (_dir, state) = state();
        let id = upload_text(&state);
        let reply = route(&state, &Method::Get, &format!("/api/analysis/certificate/{}", id), &[]);
        assert_eq!(reply.status, 200);
        let html = String::from_utf8(reply.body).unwrap();
        assert!(html.contains("VERISIGHT FORENSICS"));
        assert!(html.contains("essay.txt"));
        assert!(html.contains("Sentence Structure: Length variance"));

        let reply = route(&state, &Method::Get, "/api/analysis/certificate/999", &[]);
        assert_eq!(reply.status, 404);
    }

    #[test]
    fn test_summary_endpoint() {
        let (_dir, state) = state();
        upload_text(&state);
        let v = json(&route(&state, &Method::Get, "/api/summary", &[]));
        assert_eq!(v["data"]["total"], 1);
        assert_eq!(v["data"]["organic_count"], 1);
    }

    #[test]
    fn test_analyze_local_folder() {
        let (dir, state) = state();
        std::fs::write(dir.path().join("a.txt"), ESSAY).unwrap();
        std::fs::write(dir.path().join("ignored.xyz"), "x").unwrap();
        let url = format!(
            "/api/analyze?{}",
            serde_urlencoded::to_string([("path", dir.path().display().to_string())]).unwrap()
        );
        let v = json(&route(&state, &Method::Get, &url, &[]));
        assert_eq!(v["data"]["summary"]["total"], 1);
        assert_eq!(v["data"]["files"][0]["file_name"], "a.txt");
    }
}
