use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use server_api::{analyze, record_page, toggle_ground_truth, toggle_haiku, ApiContext};
use shared::{
    domain::Category,
    error::{AnnotationError, ApiError, ErrorCode},
    protocol::AnalysisSummary,
};
use storage::EvalStore;
use tracing::{error, info};

mod config;
mod view;

use config::{load_settings, prepare_evals_path};

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let evals_path = prepare_evals_path(&settings.evals_path)?;
    let store = EvalStore::new(&evals_path);
    let records = store.load().map_err(|err| {
        error!(
            path = %evals_path.display(),
            %err,
            "failed to load evals file; verify the file exists and is a JSON array of records"
        );
        err
    })?;
    info!(records = records.len(), path = %evals_path.display(), "loaded evaluation records");

    let state = AppState {
        api: ApiContext::new(store, records),
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "annotation server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/", get(index))
        .route("/analysis", get(analysis))
        .route("/:idx", get(question))
        .route("/update_ground_truth/:idx/:comp_idx", post(update_ground_truth))
        .route("/update_haiku/:idx/:comp_idx/:category", post(update_haiku))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn index() -> Redirect {
    Redirect::to("/0")
}

async fn question(
    State(state): State<Arc<AppState>>,
    Path(idx): Path<usize>,
) -> Result<Response, (StatusCode, Json<ApiError>)> {
    match record_page(&state.api, idx) {
        Ok(page) => Ok(Html(view::question_page(&page)).into_response()),
        // Out-of-range positions bounce back to the first record.
        Err(err) if matches!(err.code, ErrorCode::NotFound) => {
            Ok(Redirect::to("/0").into_response())
        }
        Err(err) => Err(reject(err)),
    }
}

async fn update_ground_truth(
    State(state): State<Arc<AppState>>,
    Path((idx, comp_idx)): Path<(usize, usize)>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    toggle_ground_truth(&state.api, idx, comp_idx).map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_haiku(
    State(state): State<Arc<AppState>>,
    Path((idx, comp_idx, category)): Path<(usize, usize, String)>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    let category: Category = category
        .parse()
        .map_err(|err: AnnotationError| reject(err.into()))?;
    toggle_haiku(&state.api, idx, comp_idx, category).map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn analysis(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnalysisSummary>, (StatusCode, Json<ApiError>)> {
    analyze(&state.api).map(Json).map_err(reject)
}

fn reject(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use shared::domain::EvaluationRecord;
    use tower::ServiceExt;

    fn sample_records() -> Vec<EvaluationRecord> {
        vec![
            EvaluationRecord {
                question_text: "What is the capital of France?".to_string(),
                gold_standard_answer: "Paris".to_string(),
                ground_truth_components: vec![
                    "the capital is Paris".to_string(),
                    "Paris is in France".to_string(),
                ],
                haiku_components: vec!["Paris".to_string()],
                ground_truth_annotations: None,
                haiku_annotations: None,
            },
            EvaluationRecord {
                question_text: "How many moons does Mars have?".to_string(),
                gold_standard_answer: "Two: Phobos and Deimos".to_string(),
                ground_truth_components: vec!["Mars has two moons".to_string()],
                haiku_components: vec!["Phobos".to_string(), "Deimos".to_string()],
                ground_truth_annotations: None,
                haiku_annotations: None,
            },
        ]
    }

    fn test_app() -> (Router, EvalStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = EvalStore::new(dir.path().join("evals.json"));
        store.save(&sample_records()).expect("seed");
        let records = store.load().expect("load");
        let app = build_router(Arc::new(AppState {
            api: ApiContext::new(store.clone(), records),
        }));
        (app, store, dir)
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf8 body")
    }

    #[tokio::test]
    async fn root_redirects_to_first_record() {
        let (app, _store, _dir) = test_app();
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/0");
    }

    #[tokio::test]
    async fn out_of_range_position_redirects_to_first_record() {
        let (app, _store, _dir) = test_app();
        let response = app
            .oneshot(Request::get("/9").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/0");
    }

    #[tokio::test]
    async fn first_record_renders_with_previous_disabled() {
        let (app, _store, _dir) = test_app();
        let response = app
            .oneshot(Request::get("/0").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let html = body_text(response).await;
        assert!(html.contains("What is the capital of France?"));
        assert!(html.contains("<button disabled>Previous</button>"));
        assert!(html.contains("<a href=\"/1\">Next</a>"));
    }

    #[tokio::test]
    async fn last_record_renders_with_next_disabled() {
        let (app, _store, _dir) = test_app();
        let response = app
            .oneshot(Request::get("/1").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let html = body_text(response).await;
        assert!(html.contains("<a href=\"/0\">Previous</a>"));
        assert!(html.contains("<button disabled>Next</button>"));
        assert!(html.contains("Question 2 of 2"));
    }

    #[tokio::test]
    async fn ground_truth_toggle_acknowledges_empty_and_persists() {
        let (app, store, _dir) = test_app();
        let response = app
            .oneshot(
                Request::post("/update_ground_truth/0/1")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let records = store.load().expect("reload");
        assert_eq!(
            records[0].ground_truth_annotations.as_deref(),
            Some([false, true].as_slice())
        );
    }

    #[tokio::test]
    async fn haiku_toggle_only_touches_the_requested_category() {
        let (app, store, _dir) = test_app();
        let response = app
            .oneshot(
                Request::post("/update_haiku/1/0/partial")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let records = store.load().expect("reload");
        assert_eq!(records[1].haiku_flag(Category::Partial, 0), Ok(true));
        assert_eq!(records[1].haiku_flag(Category::Exact, 0), Ok(false));
    }

    #[tokio::test]
    async fn unknown_category_is_rejected() {
        let (app, store, _dir) = test_app();
        let response = app
            .oneshot(
                Request::post("/update_haiku/0/0/bogus")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let records = store.load().expect("reload");
        for category in Category::ALL {
            assert_eq!(records[0].haiku_flag(category, 0), Ok(false));
        }
    }

    #[tokio::test]
    async fn out_of_range_toggle_is_rejected() {
        let (app, _store, _dir) = test_app();
        let response = app
            .oneshot(
                Request::post("/update_ground_truth/0/9")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn analysis_reports_aggregate_counts() {
        let (app, _store, _dir) = test_app();

        let toggles = [
            "/update_ground_truth/0/0",
            "/update_haiku/0/0/exact",
            "/update_haiku/1/0/exact",
            "/update_haiku/1/1/exact",
        ];
        for uri in toggles {
            let response = app
                .clone()
                .oneshot(Request::post(uri).body(Body::empty()).expect("request"))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
        }

        let response = app
            .oneshot(
                Request::get("/analysis")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let summary: AnalysisSummary =
            serde_json::from_str(&body_text(response).await).expect("summary json");
        assert_eq!(summary.component_counts.exact, 3);
        assert_eq!(summary.component_counts.missing, 1);
        assert_eq!(summary.question_counts.exact, 2);
        assert_eq!(summary.question_counts.missing, 1);
        assert_eq!(summary.questions_analyzed, 2);
    }

    #[tokio::test]
    async fn healthz_responds_ok() {
        let (app, _store, _dir) = test_app();
        let response = app
            .oneshot(Request::get("/healthz").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
