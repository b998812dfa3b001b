use crate::modules::request::handle::*;
use actix_web::web::{scope, ServiceConfig};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/requests")
            .service(list_inbox)
            .service(list_outbox)
            .service(submit_request)
            .service(accept_request)
            .service(decline_request),
    );
}
