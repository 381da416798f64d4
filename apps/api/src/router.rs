use std::sync::Arc;

use axum::{routing::get, Router};
use tracing::info;

use appointment_cell::{
    appointment_routes, AppointmentStore, InMemoryAppointmentStore, RealtimeAppointmentStore,
    SchedulingPolicy, SchedulingService,
};
use shared_config::{AppConfig, StoreBackend};
use shared_utils::identity::{IdentityResolver, JwtIdentityResolver};

pub fn build_store(config: &AppConfig) -> Arc<dyn AppointmentStore> {
    match config.store_backend {
        StoreBackend::Realtime => {
            info!("Using realtime database appointment store at {}", config.database_url);
            Arc::new(RealtimeAppointmentStore::new(config))
        }
        StoreBackend::Memory => {
            info!("Using in-memory appointment store");
            Arc::new(InMemoryAppointmentStore::new())
        }
    }
}

pub fn create_router(config: &AppConfig, store: Arc<dyn AppointmentStore>) -> Router {
    let service = Arc::new(SchedulingService::with_policy(
        store,
        SchedulingPolicy::from_config(config),
    ));
    let resolver: Arc<dyn IdentityResolver> = Arc::new(JwtIdentityResolver::from_config(config));

    Router::new()
        .route("/", get(|| async { "Patient portal API is running!" }))
        .nest("/api/appointments", appointment_routes(service, resolver))
}
