use actix_cors::Cors;
use actix_web::{
    self, App, HttpServer,
    middleware::{Logger, from_fn},
    web,
};
use std::sync::{Arc, LazyLock};

use crate::{
    configs::{RedisCache, connect_database},
    middlewares::{authentication, authorization},
    modules::{
        allocation::{repository_pg::AllocationRepositoryPg, service::AllocationService},
        notification::{repository_pg::NotificationRepositoryPg, service::NotificationService},
        request::{repository_pg::RequestRepositoryPg, service::RequestService},
        user::{repository_pg::UserRepositoryPg, schema::UserRole, service::UserService},
    },
};

mod api;
mod configs;
mod constants;
mod middlewares;
mod modules;
mod utils;

pub static ENV: LazyLock<constants::Env> = LazyLock::new(|| {
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Environment variables loaded from .env file");
    constants::Env::default()
});

#[actix_web::get("/")]
async fn health_check() -> &'static str {
    "Server is running"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let db_pool =
        connect_database().await.map_err(|_| std::io::Error::other("Database connection error"))?;

    let redis_pool =
        RedisCache::new().await.map_err(|_| std::io::Error::other("Redis connection error"))?;

    let user_repo = UserRepositoryPg::new(db_pool.clone());
    let request_repo = RequestRepositoryPg::new(db_pool.clone());
    let notification_repo = NotificationRepositoryPg::new(db_pool.clone());
    let allocation_repo = AllocationRepositoryPg::new(db_pool.clone());

    let notification_service = NotificationService::with_dependencies(Arc::new(notification_repo));
    let user_service = UserService::with_dependencies(
        Arc::new(user_repo.clone()),
        Arc::new(request_repo.clone()),
        Arc::new(redis_pool),
    );
    let request_service = RequestService::with_dependencies(
        Arc::new(request_repo),
        Arc::new(user_repo),
        Arc::new(notification_service.clone()),
    );
    let allocation_service = AllocationService::with_dependencies(Arc::new(allocation_repo));

    println!("Starting server at http://{}:{}", ENV.ip.as_str(), ENV.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(ENV.frontend_url.as_str())
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(request_service.clone()))
            .app_data(web::Data::new(notification_service.clone()))
            .app_data(web::Data::new(allocation_service.clone()))
            .app_data(web::Data::new(db_pool.clone()))
            .service(health_check)
            .service(
                web::scope("/api")
                    .configure(modules::user::route::public_api_configure)
                    .configure(modules::allocation::route::configure)
                    .service(
                        web::scope("")
                            .wrap(from_fn(authorization(vec![
                                UserRole::User,
                                UserRole::Affiliate,
                                UserRole::Admin,
                            ])))
                            .wrap(from_fn(authentication))
                            .configure(modules::user::route::configure)
                            .configure(modules::request::route::configure)
                            .configure(modules::notification::route::configure),
                    ),
            )
    })
    .bind((ENV.ip.as_str(), ENV.port))?
    .workers(2)
    .run()
    .await
}
