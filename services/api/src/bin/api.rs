//! services/api/src/bin/api.rs

use std::sync::Arc;

use academy_core::ports::CertificateLedger;
use api_lib::{
    adapters::{db::DbAdapter, chain::InProcessLedger, ipfs::InMemoryMetadataStore},
    config::Config,
    error::ApiError,
    web::{
        auth::{connect_handler, disconnect_handler},
        create_course_handler, create_module_handler, get_certificate_handler,
        get_course_progress_handler, get_stats_handler, get_user_certificates_handler,
        get_user_progress_handler, middleware::require_auth, mint_certificate_handler,
        rest::ApiDoc, state::AppState, transfer_handler, ws_handler,
    },
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!(
        "Configuration loaded ({} network). Starting server...",
        config.network
    );

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Ledger and Metadata Adapters ---
    let ledger = Arc::new(InProcessLedger::new(
        config.admin_principal.clone(),
        config.confirmation_delay,
    ));
    seed_catalog(ledger.as_ref(), &config).await?;
    let metadata_store = Arc::new(InMemoryMetadataStore::new());

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        ledger,
        metadata_store,
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/auth/connect", post(connect_handler))
        .route("/api/auth/disconnect", post(disconnect_handler))
        .route("/api/certificates/{token_id}", get(get_certificate_handler))
        .route("/api/users/{address}/progress", get(get_user_progress_handler))
        .route(
            "/api/users/{address}/certificates",
            get(get_user_certificates_handler),
        )
        .route(
            "/api/courses/{course_id}/progress/{address}",
            get(get_course_progress_handler),
        )
        .route("/api/stats", get(get_stats_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/ws", get(ws_handler))
        .route(
            "/api/certificates/{token_id}/transfer",
            post(transfer_handler),
        )
        .route("/api/certificates/mint", post(mint_certificate_handler))
        .route("/api/admin/courses", post(create_course_handler))
        .route("/api/admin/modules", post(create_module_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Seeds the launch catalog into the fresh in-process ledger: the three
/// starter courses with one module each.
async fn seed_catalog(ledger: &InProcessLedger, config: &Config) -> Result<(), ApiError> {
    let admin = &config.admin_principal;

    let courses = [
        (1u64, "Hello Clarity", "Learn the basics of Clarity smart contract language", 1u32),
        (2, "Your First DApp", "Build and deploy a complete decentralized application", 2),
        (3, "NFTs on Stacks", "Create and trade non-fungible tokens secured by Bitcoin", 3),
    ];
    for (course_id, name, description, difficulty) in courses {
        ledger
            .create_course(admin, course_id, name, description, difficulty)
            .await?;
    }

    let modules = [
        (101u64, 1u64, "Introduction to Clarity", "Learn the basics of Clarity syntax", 10u64, 1u32, 60u32),
        (201, 2, "Wiring Up a Wallet", "Connect a wallet and sign your first transaction", 15, 2, 90),
        (301, 3, "Minting an NFT", "Define and mint a non-fungible token", 20, 3, 120),
    ];
    for (module_id, course_id, name, description, points, difficulty, minutes) in modules {
        ledger
            .create_module(admin, module_id, course_id, name, description, points, difficulty, minutes)
            .await?;
    }

    info!("Seeded {} courses into the ledger catalog.", courses.len());
    Ok(())
}
