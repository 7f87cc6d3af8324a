//! IVF Success Estimator - HTTP API
//!
//! Serves cumulative-chance estimates from the published regression formulas.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    IVF ESTIMATOR SERVER                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌─────────────────────────┐ │
//! │  │  API      │  │  Request  │  │  Estimator Core         │ │
//! │  │  Gateway  │─►│  Checks   │─►│  (select + evaluate)    │ │
//! │  │  (Axum)   │  │           │  │                         │ │
//! │  └───────────┘  └───────────┘  └────────────┬────────────┘ │
//! │                                             ▼              │
//! │                                  ┌─────────────────────┐   │
//! │                                  │ Formula table (CSV) │   │
//! │                                  │ loaded at startup   │   │
//! │                                  └─────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod models;
mod handlers;
mod error;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
    http::{header, HeaderValue, Method},
};
use ivf_estimator_core::FormulaTable;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before reading RUST_LOG / LOG_FORMAT
    dotenvy::dotenv().ok();
    init_tracing();

    let config = config::Config::from_env();

    tracing::info!("IVF Estimator Server starting...");
    tracing::info!("Formula table: {}", config.formulas_path.display());

    // Refuse to serve without coefficients
    let table = FormulaTable::from_csv_path(&config.formulas_path)
        .with_context(|| format!("failed to load formula table {}", config.formulas_path.display()))?;

    let state = AppState {
        table: Arc::new(table),
        config: config.clone(),
    };

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "ivf_estimator_server=debug,ivf_estimator_core=info,tower_http=debug".into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<FormulaTable>,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);

    Router::new()
        .route("/healthz", get(handlers::health::check))
        .route("/api/calculate", post(handlers::calculate::calculate))
        .route("/api/formulas", get(handlers::formulas::list))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const FIXTURE: &str = include_str!("../../estimator-core/testdata/formulas.csv");
    const ORIGIN: &str = "http://localhost:5173";

    fn app() -> Router {
        let table = FormulaTable::from_csv_reader(FIXTURE.as_bytes()).unwrap();
        create_router(AppState {
            table: Arc::new(table),
            config: config::Config {
                port: 0,
                formulas_path: PathBuf::from("unused.csv"),
                cors_allowed_origins: vec![ORIGIN.to_string()],
            },
        })
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn post_calculate(body: Value) -> (StatusCode, Value) {
        send(
            Request::post("/api/calculate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    fn scenario(egg_source: &str, prior_ivf: &str, reasons: &[&str]) -> Value {
        json!({
            "age": 32,
            "weightLbs": 141,
            "heightFt": 5,
            "heightIn": 6,
            "priorIvfCycles": prior_ivf,
            "priorPregnancies": 1,
            "priorBirths": 1,
            "reasons": reasons,
            "eggSource": egg_source,
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(Request::get("/healthz").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["formulas"], 6);
    }

    #[tokio::test]
    async fn test_calculate_own_eggs() {
        let (status, body) = post_calculate(scenario("own", "no", &["endometriosis", "ovulatory_disorder"])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "cumulativeChancePercent": 69.8 }));
    }

    #[tokio::test]
    async fn test_calculate_donor_eggs_with_blank_prior_ivf() {
        let mut request = scenario("donor", "", &["unknown"]);
        request["priorPregnancies"] = json!(0);
        request["priorBirths"] = json!(0);

        let (status, body) = post_calculate(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cumulativeChancePercent"], 66.07);
    }

    #[tokio::test]
    async fn test_validation_errors_are_collected() {
        let mut request = scenario("own", "", &["unknown", "endometriosis"]);
        request["age"] = json!(51);

        let (status, body) = post_calculate(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert_eq!(
            body["errors"],
            json!({
                "age": "must be between 20 and 50",
                "priorIvfCycles": "must be 'yes' or 'no' when planning to use 'own' eggs",
                "reasons": "'I don't know/no reason' must be selected by itself",
            })
        );
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let (status, body) = send(
            Request::post("/api/calculate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"age\": \"thirty\"}"))
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid request format");
        assert!(body["details"].is_string());
    }

    #[tokio::test]
    async fn test_missing_category_is_unprocessable() {
        let partial: Vec<_> = FormulaTable::from_csv_reader(FIXTURE.as_bytes())
            .unwrap()
            .all()
            .iter()
            .filter(|f| f.key.using_own_eggs)
            .cloned()
            .collect();
        let app = create_router(AppState {
            table: Arc::new(FormulaTable::new(partial).unwrap()),
            config: config::Config {
                port: 0,
                formulas_path: PathBuf::from("unused.csv"),
                cors_allowed_origins: vec![],
            },
        });

        let response = app
            .oneshot(
                Request::post("/api/calculate")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(scenario("donor", "", &["other"]).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_formula_listing() {
        let (status, body) = send(Request::get("/api/formulas").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fingerprint"].as_str().map(str::len), Some(64));
        assert_eq!(
            body["formulas"][4],
            json!({
                "label": "Fixture 3-1",
                "usingOwnEggs": false,
                "attemptedIvfPreviously": null,
                "isReasonKnown": true,
            })
        );
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_configured_origin() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/calculate")
                    .header(header::ORIGIN, ORIGIN)
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_success());
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            ORIGIN
        );
    }

    #[tokio::test]
    async fn test_cors_rejects_other_origins() {
        let response = app()
            .oneshot(
                Request::get("/healthz")
                    .header(header::ORIGIN, "https://elsewhere.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
