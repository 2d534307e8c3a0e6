//! Identity gate behavior observed through the HTTP router: email verification, KYC intake and
//! review, and the payment gate in front of donor search.

mod common {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use tower::ServiceExt;

    use lifelink::config::WorkflowConfig;
    use lifelink::workflows::identity::Account;
    use lifelink::workflows::outbound::{
        BlobStorage, ChargeStatus, MailMessage, MailTransport, PaymentCustomer, PaymentGateway,
        UpstreamError,
    };
    use lifelink::workflows::{workflow_router, InMemoryStore, WorkflowDeps, WorkflowState};

    #[derive(Default)]
    pub(super) struct Outbox(Mutex<Vec<MailMessage>>);

    impl Outbox {
        pub(super) fn count(&self) -> usize {
            self.0.lock().expect("outbox mutex").len()
        }
    }

    #[async_trait]
    impl MailTransport for Outbox {
        async fn send(&self, message: &MailMessage) -> Result<(), UpstreamError> {
            self.0.lock().expect("outbox mutex").push(message.clone());
            Ok(())
        }
    }

    struct EchoBlobs;

    #[async_trait]
    impl BlobStorage for EchoBlobs {
        async fn upload(&self, file_name: &str, _content: &[u8]) -> Result<String, UpstreamError> {
            Ok(format!("https://blobs.test/{file_name}"))
        }

        async fn remove(&self, _url: &str) -> Result<(), UpstreamError> {
            Ok(())
        }
    }

    struct ApprovingGateway;

    #[async_trait]
    impl PaymentGateway for ApprovingGateway {
        async fn initialize(
            &self,
            _amount: u64,
            _customer: &PaymentCustomer,
            reference: &str,
        ) -> Result<String, UpstreamError> {
            Ok(format!("https://checkout.test/{reference}"))
        }

        async fn verify(&self, _reference: &str) -> Result<ChargeStatus, UpstreamError> {
            Ok(ChargeStatus::Success)
        }
    }

    pub(super) struct World {
        pub state: WorkflowState,
        pub router: Router,
        pub outbox: Arc<Outbox>,
    }

    impl World {
        pub(super) fn new() -> Self {
            let outbox = Arc::new(Outbox::default());
            let deps = WorkflowDeps::in_memory(
                Arc::new(InMemoryStore::new()),
                outbox.clone(),
                Arc::new(EchoBlobs),
                Arc::new(ApprovingGateway),
            );
            let state = WorkflowState::new(deps, &WorkflowConfig::development());
            Self {
                router: workflow_router(state.clone()),
                state,
                outbox,
            }
        }

        pub(super) async fn enroll(&self, account: Account) -> (Account, String) {
            let account = self
                .state
                .identity
                .enroll(account)
                .await
                .expect("account enrolls");
            let issued = self.state.sessions.issue(&account).expect("session issues");
            (account, format!("Bearer {}", issued.token))
        }

        pub(super) async fn call(
            &self,
            method: Method,
            uri: &str,
            bearer: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(bearer) = bearer {
                builder = builder.header(header::AUTHORIZATION, bearer);
            }
            let request = match body {
                Some(payload) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_vec(&payload).expect("encodes")))
                    .expect("request builds"),
                None => builder.body(Body::empty()).expect("request builds"),
            };

            let response = self
                .router
                .clone()
                .oneshot(request)
                .await
                .expect("route executes");
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("body collects");
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).expect("body is json")
            };
            (status, value)
        }
    }
}

use axum::http::{Method, StatusCode};
use common::World;
use lifelink::workflows::identity::Account;
use serde_json::json;

fn kyc_body() -> serde_json::Value {
    json!({
        "licenseNumber": "LIC-2291",
        "documents": [
            { "kind": "facilityImage", "fileName": "facility.jpg", "content": "c2Nhbg==" },
            { "kind": "accreditedCertificate", "fileName": "certificate.pdf", "content": "c2Nhbg==" },
            { "kind": "utilityBill", "fileName": "bill.pdf", "content": "c2Nhbg==" }
        ]
    })
}

#[tokio::test]
async fn verification_is_idempotent() {
    let world = World::new();
    let (donor, _) = world.enroll(Account::donor("Ada Obi", "ada@x.com")).await;
    let mails_after_enrollment = world.outbox.count();

    world
        .state
        .identity
        .mark_verified(&donor.id)
        .expect("first verification");
    let again = world.state.identity.mark_verified(&donor.id);
    assert!(matches!(
        again,
        Err(lifelink::workflows::WorkflowError::Conflict(_))
    ));
    assert_eq!(world.outbox.count(), mails_after_enrollment);

    let (status, body) = world
        .call(
            Method::POST,
            "/api/v1/auth/resend-verification",
            None,
            Some(json!({ "email": "ada@x.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");
}

#[tokio::test]
async fn kyc_single_pending_and_review_flow() {
    let world = World::new();
    let (_, hospital_bearer) = world
        .enroll(Account::hospital("City Hospital", "city@h.com"))
        .await;
    let (_, admin_bearer) = world
        .enroll(Account::admin("Site Admin", "admin@lifelink.test"))
        .await;

    let (status, body) = world
        .call(
            Method::POST,
            "/api/v1/hospital/kyc",
            Some(&hospital_bearer),
            Some(kyc_body()),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    let kyc_id = body["id"].as_str().expect("id").to_string();

    let (status, _) = world
        .call(
            Method::POST,
            "/api/v1/hospital/kyc",
            Some(&hospital_bearer),
            Some(json!({ "licenseNumber": "", "documents": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = world
        .call(Method::GET, "/api/v1/admin/kyc", Some(&hospital_bearer), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = world
        .call(
            Method::PATCH,
            &format!("/api/v1/admin/kyc/{kyc_id}/approve"),
            Some(&admin_bearer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    let (status, _) = world
        .call(
            Method::PATCH,
            &format!("/api/v1/admin/kyc/{kyc_id}/decline"),
            Some(&admin_bearer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn donor_search_opens_after_kyc_and_payment() {
    let world = World::new();
    world.enroll(Account::donor("Ada Obi", "ada@x.com")).await;
    let (_, hospital_bearer) = world
        .enroll(Account::hospital("City Hospital", "city@h.com"))
        .await;
    let (_, admin_bearer) = world
        .enroll(Account::admin("Site Admin", "admin@lifelink.test"))
        .await;

    let (status, _) = world
        .call(
            Method::GET,
            "/api/v1/hospital/donors",
            Some(&hospital_bearer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = world
        .call(
            Method::POST,
            "/api/v1/hospital/kyc",
            Some(&hospital_bearer),
            Some(kyc_body()),
        )
        .await;
    let kyc_id = body["id"].as_str().expect("id").to_string();
    world
        .call(
            Method::PATCH,
            &format!("/api/v1/admin/kyc/{kyc_id}/approve"),
            Some(&admin_bearer),
            None,
        )
        .await;

    let (status, body) = world
        .call(
            Method::GET,
            "/api/v1/hospital/donors",
            Some(&hospital_bearer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"]
        .as_str()
        .unwrap_or_default()
        .contains("payment"));

    let (status, body) = world
        .call(
            Method::POST,
            "/api/v1/payments",
            Some(&hospital_bearer),
            Some(json!({ "plan": "quarterly" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["amount"], 30_000);
    let reference = body["reference"].as_str().expect("reference").to_string();

    let (status, body) = world
        .call(
            Method::POST,
            &format!("/api/v1/payments/{reference}/verify"),
            Some(&hospital_bearer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let (status, body) = world
        .call(
            Method::GET,
            "/api/v1/hospital/donors",
            Some(&hospital_bearer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["donors"][0]["email"], "ada@x.com");
    assert!(body["donors"][0].get("notifications").is_none());
}
