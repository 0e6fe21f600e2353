//! LearnHub Backend
//!
//! REST backend for an e-learning platform: course catalog, purchases, notifications and site
//! layout, backed by SQLite with a Redis (or in-process) read-through cache.

mod api;
mod auth;
mod cache;
mod config;
mod db;
mod errors;
mod jobs;
mod mail;
mod models;
mod notify;
mod providers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{delete, get, post, put},
    Router,
};
use tokio::sync::watch;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cache::{Cache, CacheService, MemoryCache, RedisCache};
use config::Config;
use db::Repository;
use jobs::{RetentionJob, SystemClock};
use mail::{EmailSender, NoopEmailSender, OutboxDispatcher, SmtpEmailSender, TemplateRenderer};
use notify::LiveHub;
use providers::{
    CloudinaryClient, MediaStore, PaymentGateway, StripeClient, Unconfigured, VdoCipherClient,
    VideoOtpProvider,
};

/// Request bodies carry images as data URIs.
const BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Repository,
    pub cache: CacheService,
    pub media: Arc<dyn MediaStore>,
    pub payments: Arc<dyn PaymentGateway>,
    pub video: Arc<dyn VideoOtpProvider>,
    pub mail: Arc<TemplateRenderer>,
    pub hub: LiveHub,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting LearnHub Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Repository::new(pool);

    // Initialize cache
    let cache: Arc<dyn Cache> = match &config.redis_url {
        Some(url) => {
            tracing::info!("Using Redis cache");
            Arc::new(RedisCache::new(url).await?)
        }
        None => {
            tracing::warn!("LEARNHUB_REDIS_URL not set, using in-process cache");
            Arc::new(MemoryCache::new())
        }
    };

    // External providers
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let media: Arc<dyn MediaStore> = match &config.cloudinary {
        Some(cloudinary) => Arc::new(CloudinaryClient::new(http.clone(), cloudinary.clone())),
        None => {
            tracing::warn!("Cloudinary credentials not set, image uploads are disabled");
            Arc::new(Unconfigured("Media host"))
        }
    };
    let payments: Arc<dyn PaymentGateway> = match &config.stripe {
        Some(stripe) => Arc::new(StripeClient::new(http.clone(), stripe.secret_key.clone())),
        None => {
            tracing::warn!("Stripe keys not set, payments are disabled");
            Arc::new(Unconfigured("Payment processor"))
        }
    };
    let video: Arc<dyn VideoOtpProvider> = match &config.vdocipher_api_secret {
        Some(secret) => Arc::new(VdoCipherClient::new(http.clone(), secret.clone())),
        None => {
            tracing::warn!("VdoCipher secret not set, video playback OTPs are disabled");
            Arc::new(Unconfigured("Video host"))
        }
    };
    let sender: Arc<dyn EmailSender> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpEmailSender::new(smtp)),
        None => {
            tracing::warn!("SMTP not configured, emails are logged and dropped");
            Arc::new(NoopEmailSender)
        }
    };

    // Background jobs
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let outbox = OutboxDispatcher::new(repo.clone(), sender, config.outbox_interval);
    let outbox_task = tokio::spawn(outbox.run(shutdown_rx.clone()));

    let retention = RetentionJob::new(repo.clone(), Arc::new(SystemClock));
    let retention_task = tokio::spawn(retention.run(shutdown_rx));

    // Create application state
    let state = AppState {
        repo,
        cache: CacheService::new(cache),
        media,
        payments,
        video,
        mail: Arc::new(TemplateRenderer::new()?),
        hub: LiveHub::new(),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped, waiting for background jobs");
    shutdown_tx.send(true).ok();
    let _ = tokio::join!(outbox_task, retention_task);

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let origin = state
        .config
        .cors_origin
        .as_deref()
        .and_then(|o| HeaderValue::from_str(o).ok())
        .map(AllowOrigin::exact)
        .unwrap_or_else(|| AllowOrigin::from(Any));

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Courses
        .route("/create-course", post(api::create_course))
        .route("/edit-course/{id}", put(api::edit_course))
        .route("/get-course/{id}", get(api::get_single_course))
        .route("/get-courses", get(api::get_all_courses))
        .route("/get-course-content/{id}", get(api::get_course_content))
        .route("/add-question", put(api::add_question))
        .route("/add-answer", put(api::add_answer))
        .route("/add-review/{id}", put(api::add_review))
        .route("/add-reply/{id}", put(api::add_reply_to_review))
        .route("/get-admin-courses", get(api::get_admin_courses))
        .route("/delete-course/{id}", delete(api::delete_course))
        .route("/getVdoCipherOTP", post(api::generate_video_url))
        // Orders
        .route("/create-order", post(api::create_order))
        .route("/get-orders", get(api::get_all_orders))
        .route(
            "/payment/stripepublishablekey",
            get(api::send_publishable_key),
        )
        .route("/payment", post(api::new_payment))
        // Notifications
        .route("/get-notifications", get(api::get_notifications))
        .route("/update-notification/{id}", put(api::update_notification))
        // Layouts
        .route("/create-layout", post(api::create_layout))
        .route("/edit-layout", put(api::edit_layout))
        .route("/get-layout/{type}", get(api::get_layout_by_type));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/test", get(api::test_endpoint))
        .route("/health", get(health_check))
        .route("/ws", get(api::ws_upgrade_handler))
        .fallback(api::route_not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(CatchPanicLayer::custom(errors::panic_response))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
