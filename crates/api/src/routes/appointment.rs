use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::{ApiState, handlers};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/appointments",
            post(handlers::appointment::create_appointment),
        )
        .route(
            "/api/appointments/:id",
            get(handlers::appointment::get_appointment)
                .delete(handlers::appointment::cancel_appointment)
                .patch(handlers::appointment::reschedule_appointment),
        )
        .route(
            "/api/appointments/:id/complete",
            post(handlers::appointment::complete_appointment),
        )
        .route(
            "/api/schools/:school_id/appointments",
            get(handlers::appointment::list_appointments),
        )
}
