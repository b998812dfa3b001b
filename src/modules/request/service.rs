use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        entitlement::policy,
        notification::{schema::NotificationEvent, service::Notifier},
        request::{
            model::{RequestDecision, RequestListItem},
            repository::RequestRepository,
            schema::{RequestEntity, RequestType},
        },
        user::repository::UserRepository,
    },
};

#[derive(Clone)]
pub struct RequestService<R, U, N>
where
    R: RequestRepository + Send + Sync,
    U: UserRepository + Send + Sync,
    N: Notifier,
{
    request_repo: Arc<R>,
    user_repo: Arc<U>,
    notifier: Arc<N>,
}

impl<R, U, N> RequestService<R, U, N>
where
    R: RequestRepository + Send + Sync,
    U: UserRepository + Send + Sync,
    N: Notifier,
{
    pub fn with_dependencies(request_repo: Arc<R>, user_repo: Arc<U>, notifier: Arc<N>) -> Self {
        RequestService { request_repo, user_repo, notifier }
    }

    pub async fn submit_request(
        &self,
        requester_id: Uuid,
        requested_id: Uuid,
        request_type: RequestType,
    ) -> Result<RequestEntity, error::SystemError> {
        if requester_id == requested_id {
            return Err(error::SystemError::SelfRequest);
        }

        let requester = self
            .user_repo
            .find_by_id(&requester_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        if self.user_repo.find_by_id(&requested_id).await?.is_none() {
            return Err(error::SystemError::not_found("Recipient not found"));
        }

        policy::can_create(&requester)?;

        // application-level check; the partial unique index backstops it
        // under concurrent submits
        if self
            .request_repo
            .find_pending(&requester_id, &requested_id, request_type)
            .await?
            .is_some()
        {
            return Err(error::SystemError::DuplicateActiveRequest);
        }

        let request = self
            .request_repo
            .create_consuming_quota(
                &requester_id,
                &requested_id,
                request_type,
                policy::has_unlimited_requests(&requester),
            )
            .await?;

        self.notify_quietly(
            &requested_id,
            NotificationEvent::RequestReceived,
            json!({
                "requestId": request.id,
                "requestType": request.request_type,
                "from": requester_id,
            }),
        )
        .await;

        Ok(request)
    }

    pub async fn respond_to_request(
        &self,
        request_id: Uuid,
        responder_id: Uuid,
        decision: RequestDecision,
    ) -> Result<RequestEntity, error::SystemError> {
        let request = self
            .request_repo
            .find_by_id(&request_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Request not found"))?;

        if request.requested_id != responder_id {
            return Err(error::SystemError::forbidden(
                "You are not allowed to respond to this request",
            ));
        }

        let responder = self
            .user_repo
            .find_by_id(&responder_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        if !policy::can_respond(&responder) {
            return Err(error::SystemError::upgrade_required(
                "Subscribe to respond to requests",
            ));
        }

        let updated = self
            .request_repo
            .update_status_if_pending(&request_id, decision.status())
            .await?
            .ok_or(error::SystemError::InvalidTransition)?;

        let event = match decision {
            RequestDecision::Accepted => NotificationEvent::RequestAccepted,
            RequestDecision::Rejected => NotificationEvent::RequestRejected,
        };
        self.notify_quietly(
            &updated.requester_id,
            event,
            json!({
                "requestId": updated.id,
                "requestType": updated.request_type,
                "by": responder_id,
            }),
        )
        .await;

        Ok(updated)
    }

    pub async fn list_inbox(
        &self,
        user_id: Uuid,
        request_type: RequestType,
    ) -> Result<Vec<RequestListItem>, error::SystemError> {
        self.request_repo.list_pending_for_recipient(&user_id, request_type).await
    }

    pub async fn list_outbox(
        &self,
        user_id: Uuid,
        request_type: RequestType,
    ) -> Result<Vec<RequestListItem>, error::SystemError> {
        self.request_repo.list_for_requester(&user_id, request_type).await
    }

    async fn notify_quietly(
        &self,
        user_id: &Uuid,
        event: NotificationEvent,
        payload: serde_json::Value,
    ) {
        if let Err(e) = self.notifier.notify(user_id, event, payload).await {
            log::warn!("Notification delivery failed for user {}: {:?}", user_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::modules::entitlement::policy::tests::test_user;
    use crate::modules::request::model::RequestUserRow;
    use crate::modules::request::schema::RequestStatus;
    use crate::modules::user::model::{InsertUser, UpdateUser};
    use crate::modules::user::schema::{Gender, PlanTier, SubscriptionStatus, UserEntity};

    type UserMap = Arc<Mutex<HashMap<Uuid, UserEntity>>>;

    struct InMemoryUsers {
        users: UserMap,
    }

    #[async_trait::async_trait]
    impl UserRepository for InMemoryUsers {
        async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError> {
            Ok(self.users.lock().unwrap().get(id).cloned())
        }

        async fn find_by_username(
            &self,
            username: &str,
        ) -> Result<Option<UserEntity>, error::SystemError> {
            Ok(self.users.lock().unwrap().values().find(|u| u.username == username).cloned())
        }

        async fn create(&self, _user: &InsertUser) -> Result<Uuid, error::SystemError> {
            unimplemented!("not exercised by workflow tests")
        }

        async fn update(
            &self,
            _id: &Uuid,
            _user: &UpdateUser,
        ) -> Result<UserEntity, error::SystemError> {
            unimplemented!("not exercised by workflow tests")
        }
    }

    struct InMemoryRequests {
        users: UserMap,
        requests: Mutex<Vec<RequestEntity>>,
    }

    impl InMemoryRequests {
        fn list_items(&self, rows: Vec<RequestEntity>, join_requester: bool) -> Vec<RequestListItem> {
            let users = self.users.lock().unwrap();
            rows.into_iter()
                .map(|r| {
                    let other = if join_requester { r.requester_id } else { r.requested_id };
                    let u = users.get(&other).expect("joined user exists");
                    RequestUserRow {
                        req_id: r.id,
                        request_type: r.request_type,
                        status: r.status,
                        created_at: r.created_at,
                        user_id: u.id,
                        display_name: u.display_name.clone(),
                        city: u.city.clone(),
                        photo_url: u.photo_url.clone(),
                    }
                    .into()
                })
                .collect()
        }
    }

    #[async_trait::async_trait]
    impl RequestRepository for InMemoryRequests {
        async fn find_by_id(
            &self,
            request_id: &Uuid,
        ) -> Result<Option<RequestEntity>, error::SystemError> {
            Ok(self.requests.lock().unwrap().iter().find(|r| r.id == *request_id).cloned())
        }

        async fn find_pending(
            &self,
            requester_id: &Uuid,
            requested_id: &Uuid,
            request_type: RequestType,
        ) -> Result<Option<RequestEntity>, error::SystemError> {
            Ok(self
                .requests
                .lock()
                .unwrap()
                .iter()
                .find(|r| {
                    r.requester_id == *requester_id
                        && r.requested_id == *requested_id
                        && r.request_type == request_type
                        && r.status == RequestStatus::Pending
                })
                .cloned())
        }

        async fn find_accepted_between(
            &self,
            user_id_a: &Uuid,
            user_id_b: &Uuid,
            request_type: RequestType,
        ) -> Result<Option<RequestEntity>, error::SystemError> {
            Ok(self
                .requests
                .lock()
                .unwrap()
                .iter()
                .find(|r| {
                    r.request_type == request_type
                        && r.status == RequestStatus::Accepted
                        && ((r.requester_id == *user_id_a && r.requested_id == *user_id_b)
                            || (r.requester_id == *user_id_b && r.requested_id == *user_id_a))
                })
                .cloned())
        }

        async fn create_consuming_quota(
            &self,
            requester_id: &Uuid,
            requested_id: &Uuid,
            request_type: RequestType,
            unlimited: bool,
        ) -> Result<RequestEntity, error::SystemError> {
            let mut users = self.users.lock().unwrap();
            let mut requests = self.requests.lock().unwrap();

            // mirror of the partial unique index
            if requests.iter().any(|r| {
                r.requester_id == *requester_id
                    && r.requested_id == *requested_id
                    && r.request_type == request_type
                    && r.status == RequestStatus::Pending
            }) {
                return Err(error::SystemError::DuplicateActiveRequest);
            }

            if !unlimited {
                let requester = users.get_mut(requester_id).expect("requester exists");
                if requester.requests_remaining <= 0 {
                    return Err(error::SystemError::InsufficientRequests);
                }
                requester.requests_remaining -= 1;
            }

            let request = RequestEntity {
                id: Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext)),
                requester_id: *requester_id,
                requested_id: *requested_id,
                request_type,
                status: RequestStatus::Pending,
                created_at: chrono::Utc::now(),
                responded_at: None,
            };
            requests.push(request.clone());
            Ok(request)
        }

        async fn list_pending_for_recipient(
            &self,
            user_id: &Uuid,
            request_type: RequestType,
        ) -> Result<Vec<RequestListItem>, error::SystemError> {
            let rows: Vec<RequestEntity> = self
                .requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| {
                    r.requested_id == *user_id
                        && r.request_type == request_type
                        && r.status == RequestStatus::Pending
                })
                .cloned()
                .collect();
            Ok(self.list_items(rows, true))
        }

        async fn list_for_requester(
            &self,
            user_id: &Uuid,
            request_type: RequestType,
        ) -> Result<Vec<RequestListItem>, error::SystemError> {
            let rows: Vec<RequestEntity> = self
                .requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.requester_id == *user_id && r.request_type == request_type)
                .cloned()
                .collect();
            Ok(self.list_items(rows, false))
        }

        async fn update_status_if_pending(
            &self,
            request_id: &Uuid,
            status: RequestStatus,
        ) -> Result<Option<RequestEntity>, error::SystemError> {
            let mut requests = self.requests.lock().unwrap();
            match requests
                .iter_mut()
                .find(|r| r.id == *request_id && r.status == RequestStatus::Pending)
            {
                Some(r) => {
                    r.status = status;
                    r.responded_at = Some(chrono::Utc::now());
                    Ok(Some(r.clone()))
                }
                None => Ok(None),
            }
        }
    }

    struct RecordingNotifier {
        sent: Mutex<Vec<(Uuid, NotificationEvent)>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(
            &self,
            user_id: &Uuid,
            event: NotificationEvent,
            _payload: serde_json::Value,
        ) -> Result<(), error::SystemError> {
            if self.fail {
                return Err(error::SystemError::StoreUnavailable("sink down".into()));
            }
            self.sent.lock().unwrap().push((*user_id, event));
            Ok(())
        }
    }

    struct Fixture {
        users: UserMap,
        notifier: Arc<RecordingNotifier>,
        service: RequestService<InMemoryRequests, InMemoryUsers, RecordingNotifier>,
    }

    fn fixture(entities: Vec<UserEntity>, failing_notifier: bool) -> Fixture {
        let users: UserMap =
            Arc::new(Mutex::new(entities.into_iter().map(|u| (u.id, u)).collect()));
        let notifier = Arc::new(RecordingNotifier {
            sent: Mutex::new(Vec::new()),
            fail: failing_notifier,
        });
        let service = RequestService::with_dependencies(
            Arc::new(InMemoryRequests { users: users.clone(), requests: Mutex::new(Vec::new()) }),
            Arc::new(InMemoryUsers { users: users.clone() }),
            notifier.clone(),
        );
        Fixture { users, notifier, service }
    }

    fn remaining(fx: &Fixture, id: &Uuid) -> i32 {
        fx.users.lock().unwrap().get(id).unwrap().requests_remaining
    }

    #[tokio::test]
    async fn self_request_is_rejected() {
        let a = test_user(Gender::Male, SubscriptionStatus::Inactive, None, 1);
        let a_id = a.id;
        let fx = fixture(vec![a], false);

        let err = fx.service.submit_request(a_id, a_id, RequestType::Match).await.unwrap_err();
        assert!(matches!(err, error::SystemError::SelfRequest));
    }

    #[tokio::test]
    async fn submit_decrements_quota_and_notifies_recipient() {
        let a = test_user(Gender::Male, SubscriptionStatus::Inactive, None, 1);
        let b = test_user(Gender::Female, SubscriptionStatus::Inactive, None, 3);
        let (a_id, b_id) = (a.id, b.id);
        let fx = fixture(vec![a, b], false);

        let request = fx.service.submit_request(a_id, b_id, RequestType::Match).await.unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(remaining(&fx, &a_id), 0);

        let sent = fx.notifier.sent.lock().unwrap();
        assert_eq!(*sent, vec![(b_id, NotificationEvent::RequestReceived)]);
    }

    #[tokio::test]
    async fn duplicate_pending_request_is_rejected() {
        let a = test_user(Gender::Male, SubscriptionStatus::Active, Some(PlanTier::Basic), 5);
        let b = test_user(Gender::Female, SubscriptionStatus::Inactive, None, 3);
        let (a_id, b_id) = (a.id, b.id);
        let fx = fixture(vec![a, b], false);

        fx.service.submit_request(a_id, b_id, RequestType::Match).await.unwrap();
        let err = fx.service.submit_request(a_id, b_id, RequestType::Match).await.unwrap_err();
        assert!(matches!(err, error::SystemError::DuplicateActiveRequest));
        // only the first submit consumed quota
        assert_eq!(remaining(&fx, &a_id), 4);

        // a photo-reveal request to the same profile is a distinct pair
        fx.service.submit_request(a_id, b_id, RequestType::PhotoReveal).await.unwrap();
    }

    #[tokio::test]
    async fn exhausted_quota_rejects_further_submits() {
        let a = test_user(Gender::Male, SubscriptionStatus::Inactive, None, 1);
        let b = test_user(Gender::Female, SubscriptionStatus::Inactive, None, 3);
        let c = test_user(Gender::Female, SubscriptionStatus::Inactive, None, 3);
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        let fx = fixture(vec![a, b, c], false);

        fx.service.submit_request(a_id, b_id, RequestType::Match).await.unwrap();
        assert_eq!(remaining(&fx, &a_id), 0);

        let err = fx.service.submit_request(a_id, c_id, RequestType::Match).await.unwrap_err();
        assert!(matches!(err, error::SystemError::InsufficientRequests));
        assert_eq!(remaining(&fx, &a_id), 0);
    }

    #[tokio::test]
    async fn unlimited_plan_skips_the_counter() {
        let a = test_user(Gender::Male, SubscriptionStatus::Active, Some(PlanTier::Unlimited), 0);
        let b = test_user(Gender::Female, SubscriptionStatus::Inactive, None, 3);
        let (a_id, b_id) = (a.id, b.id);
        let fx = fixture(vec![a, b], false);

        fx.service.submit_request(a_id, b_id, RequestType::Match).await.unwrap();
        assert_eq!(remaining(&fx, &a_id), 0);
    }

    #[tokio::test]
    async fn only_the_addressee_may_respond() {
        let a = test_user(Gender::Male, SubscriptionStatus::Inactive, None, 1);
        let b = test_user(Gender::Female, SubscriptionStatus::Inactive, None, 3);
        let (a_id, b_id) = (a.id, b.id);
        let fx = fixture(vec![a, b], false);

        let request = fx.service.submit_request(a_id, b_id, RequestType::Match).await.unwrap();

        // the requester cannot accept their own request
        let err = fx
            .service
            .respond_to_request(request.id, a_id, RequestDecision::Accepted)
            .await
            .unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));
    }

    #[tokio::test]
    async fn freemium_responder_is_gated_but_can_list_inbox() {
        let a = test_user(Gender::Female, SubscriptionStatus::Inactive, None, 3);
        let b = test_user(Gender::Male, SubscriptionStatus::Inactive, None, 0);
        let (a_id, b_id) = (a.id, b.id);
        let fx = fixture(vec![a, b], false);

        let request = fx.service.submit_request(a_id, b_id, RequestType::Match).await.unwrap();

        let inbox = fx.service.list_inbox(b_id, RequestType::Match).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].id, request.id);

        let err = fx
            .service
            .respond_to_request(request.id, b_id, RequestDecision::Accepted)
            .await
            .unwrap_err();
        assert!(matches!(err, error::SystemError::UpgradeRequired(_)));

        // state untouched: still pending in the inbox
        let inbox = fx.service.list_inbox(b_id, RequestType::Match).await.unwrap();
        assert_eq!(inbox[0].status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn a_request_transitions_exactly_once() {
        let a = test_user(Gender::Male, SubscriptionStatus::Active, Some(PlanTier::Basic), 5);
        let b = test_user(Gender::Female, SubscriptionStatus::Inactive, None, 3);
        let (a_id, b_id) = (a.id, b.id);
        let fx = fixture(vec![a, b], false);

        let request = fx.service.submit_request(a_id, b_id, RequestType::Match).await.unwrap();

        let accepted = fx
            .service
            .respond_to_request(request.id, b_id, RequestDecision::Accepted)
            .await
            .unwrap();
        assert_eq!(accepted.status, RequestStatus::Accepted);
        assert!(accepted.responded_at.is_some());

        let err = fx
            .service
            .respond_to_request(request.id, b_id, RequestDecision::Rejected)
            .await
            .unwrap_err();
        assert!(matches!(err, error::SystemError::InvalidTransition));

        let sent = fx.notifier.sent.lock().unwrap();
        assert_eq!(
            *sent,
            vec![
                (b_id, NotificationEvent::RequestReceived),
                (a_id, NotificationEvent::RequestAccepted),
            ]
        );
    }

    #[tokio::test]
    async fn photo_stays_hidden_until_reveal_is_accepted() {
        let a = test_user(Gender::Male, SubscriptionStatus::Active, Some(PlanTier::Basic), 5);
        let b = test_user(Gender::Female, SubscriptionStatus::Inactive, None, 3);
        let (a_id, b_id) = (a.id, b.id);
        let fx = fixture(vec![a, b], false);

        let request =
            fx.service.submit_request(a_id, b_id, RequestType::PhotoReveal).await.unwrap();

        let outbox = fx.service.list_outbox(a_id, RequestType::PhotoReveal).await.unwrap();
        assert!(outbox[0].user.photo_url.is_none());

        fx.service.respond_to_request(request.id, b_id, RequestDecision::Accepted).await.unwrap();

        let outbox = fx.service.list_outbox(a_id, RequestType::PhotoReveal).await.unwrap();
        assert_eq!(outbox[0].status, RequestStatus::Accepted);
        assert!(outbox[0].user.photo_url.is_some());
    }

    #[tokio::test]
    async fn notification_failure_does_not_roll_back_the_transition() {
        let a = test_user(Gender::Male, SubscriptionStatus::Active, Some(PlanTier::Basic), 5);
        let b = test_user(Gender::Female, SubscriptionStatus::Inactive, None, 3);
        let (a_id, b_id) = (a.id, b.id);
        let fx = fixture(vec![a, b], true);

        let request = fx.service.submit_request(a_id, b_id, RequestType::Match).await.unwrap();
        let accepted = fx
            .service
            .respond_to_request(request.id, b_id, RequestDecision::Accepted)
            .await
            .unwrap();
        assert_eq!(accepted.status, RequestStatus::Accepted);
    }
}
