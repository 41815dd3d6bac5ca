//! HTTP server setup

use std::sync::Arc;

use actix_web::{App, HttpServer, dev::Server, middleware::Logger, web};

use crate::{
    api::route,
    middleware::{identity::Identity, metrics::RequestMetrics},
    model::AppState,
};

/// Creates and binds the review HTTP server.
pub fn main_server(
    app_state: Arc<AppState>,
    address: String,
    port: u16,
) -> Result<Server, std::io::Error> {
    let payload_limit = app_state.configuration.max_payload_bytes();
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(Identity)
            .wrap(RequestMetrics)
            .wrap(Logger::default())
            .app_data(web::Data::from(app_state.clone()))
            .app_data(web::JsonConfig::default().limit(payload_limit))
            .configure(route::configure)
    })
    .bind((address, port))?
    .run())
}
