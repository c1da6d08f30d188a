#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Submission notifier server.

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use cph_parking_notifier::AppState;
use cph_parking_notifier::config::NotifierConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = NotifierConfig::from_env();
    if config.resend_api_key.is_none() {
        log::warn!("RESEND_API_KEY is not set; submissions will not be emailed");
    }
    log::debug!("{config:?}");

    let bind_addr = config.bind_addr.clone();
    let port = config.port;

    let client = reqwest::Client::builder()
        .user_agent(concat!("cph-parking-notifier/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(std::io::Error::other)?;
    let state = web::Data::new(AppState::from_config(config, client));

    log::info!("Starting notifier on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(cph_parking_notifier::configure)
    })
    .bind((bind_addr.as_str(), port))?
    .run()
    .await
}
