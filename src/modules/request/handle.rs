use actix_web::{get, post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::{
        notification::{repository_pg::NotificationRepositoryPg, service::NotificationService},
        request::{
            model::{RequestDecision, RequestListItem, RequestTypeQuery, SubmitRequestBody},
            repository_pg::RequestRepositoryPg,
            schema::RequestEntity,
            service::RequestService,
        },
        user::repository_pg::UserRepositoryPg,
    },
};

pub type RequestSvc = RequestService<
    RequestRepositoryPg,
    UserRepositoryPg,
    NotificationService<NotificationRepositoryPg>,
>;

#[post("/")]
pub async fn submit_request(
    request_service: web::Data<RequestSvc>,
    body: web::Json<SubmitRequestBody>,
    req: HttpRequest,
) -> Result<success::Success<RequestEntity>, error::Error> {
    let requester_id = get_claims(&req)?.sub;
    let request = request_service
        .submit_request(requester_id, body.recipient_id, body.request_type)
        .await?;

    Ok(success::Success::created(Some(request)).message("Request sent successfully"))
}

#[post("/{request_id}/accept")]
pub async fn accept_request(
    request_service: web::Data<RequestSvc>,
    request_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<RequestEntity>, error::Error> {
    let responder_id = get_claims(&req)?.sub;
    let request = request_service
        .respond_to_request(*request_id, responder_id, RequestDecision::Accepted)
        .await?;

    Ok(success::Success::ok(Some(request)).message("Request accepted successfully"))
}

#[post("/{request_id}/decline")]
pub async fn decline_request(
    request_service: web::Data<RequestSvc>,
    request_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<RequestEntity>, error::Error> {
    let responder_id = get_claims(&req)?.sub;
    let request = request_service
        .respond_to_request(*request_id, responder_id, RequestDecision::Rejected)
        .await?;

    Ok(success::Success::ok(Some(request)).message("Request declined successfully"))
}

#[get("/inbox")]
pub async fn list_inbox(
    request_service: web::Data<RequestSvc>,
    query: web::Query<RequestTypeQuery>,
    req: HttpRequest,
) -> Result<success::Success<Vec<RequestListItem>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let requests = request_service.list_inbox(user_id, query.request_type).await?;

    Ok(success::Success::ok(Some(requests)).message("Inbox retrieved successfully"))
}

#[get("/outbox")]
pub async fn list_outbox(
    request_service: web::Data<RequestSvc>,
    query: web::Query<RequestTypeQuery>,
    req: HttpRequest,
) -> Result<success::Success<Vec<RequestListItem>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let requests = request_service.list_outbox(user_id, query.request_type).await?;

    Ok(success::Success::ok(Some(requests)).message("Outbox retrieved successfully"))
}
