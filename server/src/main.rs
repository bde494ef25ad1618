use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use std::sync::Arc;

use server::config::Config;
use server::gateway::Gateway;
use server::handlers;
use server::server::ServerHandle;
use system::{FileStore, MemoryStore, PollCoordinator, PollQueries, PollStore};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();

    let store: Arc<dyn PollStore> = match &config.data_dir {
        Some(dir) => Arc::new(
            FileStore::open(dir)
                .await
                .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?,
        ),
        None => {
            log::warn!("DATA_DIR is not set, polls are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };
    let coordinator = Arc::new(PollCoordinator::new(store.clone()));
    let gateway = web::Data::new(Gateway::new(coordinator.clone(), ServerHandle::spawn()));
    let coordinator = web::Data::new(coordinator);
    let queries = web::Data::new(PollQueries::new(store));

    log::info!("Listening on {}:{}", config.host, config.port);
    let cors_origin = config.cors_origin.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allowed_origin(&cors_origin)
                    .allow_any_method()
                    .allow_any_header()
                    .supports_credentials(),
            )
            .app_data(gateway.clone())
            .app_data(coordinator.clone())
            .app_data(queries.clone())
            .configure(handlers::root)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
