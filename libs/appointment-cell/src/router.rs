// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::identity_middleware;
use shared_utils::identity::IdentityResolver;

use crate::handlers;
use crate::services::scheduling::SchedulingService;

pub fn appointment_routes(
    service: Arc<SchedulingService>,
    resolver: Arc<dyn IdentityResolver>,
) -> Router {
    Router::new()
        .route("/book", post(handlers::book_appointment))
        .route("/book-selected", post(handlers::book_selected_hospital))
        .route("/my-appointments", get(handlers::list_my_appointments))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment)
                .put(handlers::edit_appointment)
                .delete(handlers::cancel_appointment),
        )
        .layer(middleware::from_fn_with_state(resolver, identity_middleware))
        .with_state(service)
}
