use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{apply_security_headers, create_cors_layer};
use crate::handlers::{admin, events, health_check, tickets};
use crate::state::AppState;

fn ticket_routes() -> Router<AppState> {
    Router::new()
        .route("/create/:event_id", post(tickets::create_tickets))
        .route("/all", get(tickets::list_tickets))
        .route("/getticket/:ticket_id", get(tickets::get_ticket))
        .route("/event/:event_id", get(tickets::tickets_for_event))
        .route("/recentPayments", get(tickets::recent_payments))
        .route("/deleteticket/:ticket_id", delete(tickets::delete_ticket))
        .route("/verify/:ticket_id", post(tickets::confirm_purchase))
        .route("/:ticket_id/pay", post(tickets::initiate_purchase))
        .route("/:ticket_id/free", post(tickets::issue_free_ticket))
}

fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(events::create_event))
        .route("/all", get(events::list_events))
        .route("/myevents", get(events::my_events))
        .route("/getallpaymentreceived", get(events::payments_received))
        .route("/totalAmount/:event_id", get(events::total_amount))
        .route("/:event_id", get(events::get_event))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/approve/:event_id", put(admin::decide_event))
        .route("/allpayments", get(admin::all_payments))
}

pub fn create_routes(state: AppState, allowed_origins: &[String], production: bool) -> Router {
    let api = Router::new()
        .nest("/ticket", ticket_routes())
        .nest("/event", event_routes())
        .nest("/admin", admin_routes());

    let router = Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    apply_security_headers(router, production).layer(create_cors_layer(allowed_origins))
}
