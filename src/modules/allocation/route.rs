use actix_web::middleware::from_fn;
use actix_web::web::{scope, ServiceConfig};

use crate::middlewares::{authentication, authorization};
use crate::modules::allocation::handle::*;
use crate::modules::user::schema::UserRole;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/allocations")
            .wrap(from_fn(authorization(vec![UserRole::Admin])))
            .wrap(from_fn(authentication))
            .service(run_allocation),
    );
}
