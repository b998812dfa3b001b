use actix_web::{get, post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::notification::{
        repository_pg::NotificationRepositoryPg, schema::NotificationEntity,
        service::NotificationService,
    },
};

pub type NotificationSvc = NotificationService<NotificationRepositoryPg>;

#[get("/")]
pub async fn list_notifications(
    notification_service: web::Data<NotificationSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<NotificationEntity>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let notifications = notification_service.list(user_id).await?;

    Ok(success::Success::ok(Some(notifications)).message("Notifications retrieved successfully"))
}

#[post("/{notification_id}/read")]
pub async fn mark_notification_read(
    notification_service: web::Data<NotificationSvc>,
    notification_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    notification_service.mark_read(user_id, *notification_id).await?;
    Ok(success::Success::no_content())
}
