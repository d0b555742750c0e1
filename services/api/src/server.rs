use crate::cli::ServeArgs;
use crate::infra::{spawn_audit_log, AppState, Marketplace};
use crate::routes::with_marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use campus_nest::auth::{JwtSessionVerifier, Sessions};
use campus_nest::config::AppConfig;
use campus_nest::error::AppError;
use campus_nest::events::EventBus;
use campus_nest::marketplace::listings::{ContentReviewer, HttpContentReviewer, ModerationEngine};
use campus_nest::store::MemoryStore;
use campus_nest::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let store = Arc::new(MemoryStore::new());
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        store: store.clone(),
    };

    let reviewer = match HttpContentReviewer::from_config(&config.review) {
        Ok(Some(reviewer)) => Some(Arc::new(reviewer) as Arc<dyn ContentReviewer>),
        Ok(None) => {
            warn!("REVIEW_API_KEY not set; every listing goes to manual review");
            None
        }
        Err(err) => {
            warn!(error = %err, "content reviewer unavailable; every listing goes to manual review");
            None
        }
    };
    let moderation = ModerationEngine::new(reviewer, config.review.policy.clone());

    let events = EventBus::new(config.events.capacity);
    let _audit = spawn_audit_log(&events);
    let marketplace = Marketplace::build(store, moderation, events, &config.marketplace);
    let sessions = Sessions::new(JwtSessionVerifier::new(&config.session));

    let app = with_marketplace_routes(marketplace)
        .layer(Extension(sessions))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, review = ?config.review, "campus nest api ready");

    axum::serve(listener, app).await?;
    Ok(())
}
