pub mod auth;
pub mod booking;
mod config;
pub mod customer;
mod error;
mod model;
pub mod reservation;
mod schema;
pub mod staff;
mod store;
pub mod validate;


use std::net::Ipv4Addr;
use std::sync::Arc;

use auth::{Keys, SecurityAddon};
use axum::extract::FromRef;
use axum::Router;
use casbin::Enforcer;
use config::Config;
use diesel::{pg::Pg, Connection, PgConnection};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use store::{HotelStore, PgStore};
use tokio::net::TcpListener;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

const STAFF_TAG: &str = "staff";
const CUSTOMER_TAG: &str = "customer";
const BOOKING_TAG: &str = "booking";

#[derive(Clone, FromRef)]
pub struct State {
    store: Arc<dyn HotelStore>,
    enforcer: Arc<Enforcer>,
    keys: Arc<Keys>,
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    tags(
        (name = STAFF_TAG, description = "Sessions and staff accounts"),
        (name = CUSTOMER_TAG, description = "Customer records"),
        (name = BOOKING_TAG, description = "Room availability and bookings")
    )
)]
struct ApiDoc;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

fn run_migrations(
    connection: &mut impl MigrationHarness<Pg>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    connection.run_pending_migrations(MIGRATIONS)?;
    Ok(())
}

/// All API routes plus the Swagger UI.
pub fn app(state: State) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", staff::session_router())
        .nest("/api", staff::staff_router())
        .nest("/api", customer::customer_router())
        .nest("/api", booking::booking_router())
        .with_state(state)
        .split_for_parts();

    router.merge(SwaggerUi::new("/swagger-ui").url("/apidoc/openapi.json", api))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::DEBUG.into())
        .from_env()?;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_filter(filter),
        )
        .init();

    let config = Config::from_env()?;

    let mut migration_connection = PgConnection::establish(&config.database_url)?;
    run_migrations(&mut migration_connection).map_err(|e| e.to_string())?;
    drop(migration_connection);
    // set up connection pool
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);
    let pool: store::Pool = bb8::Pool::builder()
        .build(manager)
        .await
        .map_err(|e| format!("database pool: {}", e))?;

    let enforcer = auth::load_enforcer(
        config.acl_model.clone().leak(),
        config.acl_policy.clone().leak(),
    )
    .await?;

    let state = State {
        store: Arc::new(PgStore::new(pool)),
        enforcer: Arc::new(enforcer),
        keys: Arc::new(Keys::new(&config.session_secret, config.secure_cookies)),
    };

    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.port)).await?;
    info!("Listening on 0.0.0.0:{}", config.port);
    Ok(axum::serve(listener, app(state)).await?)
}
