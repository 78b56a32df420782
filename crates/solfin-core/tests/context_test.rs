#![allow(clippy::unwrap_used)]
// End-to-end tests: stores, lifecycle and notifications over a mocked API.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use solfin_api::{ApiClient, CredentialPair, HttpTransport, SessionStore};
use solfin_core::{
    AppContext, ClientConfig, NewAccount, NewTransaction, NotificationKind, OperationKind,
    OperationState, TransactionKind,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn signed_in() -> (MockServer, AppContext) {
    let server = MockServer::start().await;
    let base = Url::parse(&server.uri()).unwrap();
    let transport = HttpTransport::with_client(reqwest::Client::new(), base.clone());
    let session = Arc::new(SessionStore::in_memory());
    session.establish(
        CredentialPair {
            access_token: SecretString::from("tok".to_owned()),
            refresh_token: SecretString::from("ref".to_owned()),
            access_expiry: Utc::now() + chrono::Duration::minutes(15),
        },
        None,
    );
    let api = ApiClient::new(transport, session);
    let ctx = AppContext::with_api(ClientConfig::new(base), api);
    (server, ctx)
}

fn account_json(id: &str, balance: i64) -> serde_json::Value {
    json!({ "id": id, "name": "Cash", "kind": "cash", "currency": "HTG", "balance": balance })
}

fn new_expense(amount: i64) -> NewTransaction {
    NewTransaction {
        account_id: "a1".into(),
        kind: TransactionKind::Expense,
        amount,
        label: "Tap-tap".into(),
        category: None,
        occurred_at: Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
        budget_id: None,
    }
}

async fn mount_accounts(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/accounts"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": [account_json("a1", 10_000)] })),
        )
        .mount(server)
        .await;
}

/// Poll until `check` holds; the session watcher runs on its own task.
async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

// ── Cross-domain forwarding ─────────────────────────────────────────

#[tokio::test]
async fn test_recorded_transaction_updates_its_account() {
    let (server, ctx) = signed_in().await;
    mount_accounts(&server).await;
    Mock::given(method("POST"))
        .and(path("/transactions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {
                "transaction": {
                    "id": "t1",
                    "account_id": "a1",
                    "kind": "expense",
                    "amount": 2500,
                    "label": "Tap-tap",
                    "occurred_at": "2026-03-01T08:00:00Z"
                },
                "account": account_json("a1", 7_500)
            },
            "message": "Expense saved"
        })))
        .mount(&server)
        .await;

    ctx.accounts().fetch_all().await.unwrap();
    let receipt = ctx.record_transaction(new_expense(2500)).await.unwrap();

    assert_eq!(receipt.transaction.id, "t1");
    assert_eq!(ctx.accounts().get("a1").unwrap().balance, 7_500);
    let ids: Vec<String> = ctx
        .transactions()
        .all()
        .iter()
        .map(|t| t.id.clone())
        .collect();
    assert_eq!(ids, vec!["t1".to_owned()]);

    let visible = ctx.notifications().visible();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].kind, NotificationKind::Success);
    assert_eq!(visible[0].message, "Expense saved");
}

#[tokio::test]
async fn test_bare_transaction_response_leaves_accounts_alone() {
    let (server, ctx) = signed_in().await;
    mount_accounts(&server).await;
    Mock::given(method("POST"))
        .and(path("/transactions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {
                "id": "t2",
                "account_id": "a1",
                "kind": "expense",
                "amount": 100,
                "occurred_at": "2026-03-01T08:00:00Z"
            }
        })))
        .mount(&server)
        .await;

    ctx.accounts().fetch_all().await.unwrap();
    let receipt = ctx.record_transaction(new_expense(100)).await.unwrap();

    assert!(receipt.account.is_none());
    assert_eq!(ctx.accounts().get("a1").unwrap().balance, 10_000);
}

// ── Failure path ────────────────────────────────────────────────────

#[tokio::test]
async fn test_rejected_create_rolls_back_and_notifies_once() {
    let (server, ctx) = signed_in().await;
    Mock::given(method("POST"))
        .and(path("/accounts"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Name is already used",
            "errors": { "name": ["taken"] }
        })))
        .mount(&server)
        .await;

    let err = ctx
        .accounts()
        .create(NewAccount {
            name: "Cash".into(),
            kind: solfin_core::AccountKind::Cash,
            currency: "HTG".into(),
            initial_balance: 0,
        })
        .await
        .unwrap_err();

    assert_eq!(
        err.field_errors().unwrap().get("name").map(String::as_str),
        Some("taken")
    );
    assert!(ctx.accounts().all().is_empty());

    let status = ctx.accounts().status_of(OperationKind::CREATE);
    assert_eq!(status.state, OperationState::Failed);

    let visible = ctx.notifications().visible();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].kind, NotificationKind::Error);
    assert_eq!(visible[0].message, "Name is already used");
}

#[tokio::test]
async fn test_quiet_fetch_does_not_notify() {
    let (server, ctx) = signed_in().await;
    mount_accounts(&server).await;

    ctx.accounts().fetch_all().await.unwrap();

    assert_eq!(ctx.accounts().all().len(), 1);
    assert!(ctx.notifications().is_empty());
}

#[tokio::test]
async fn test_server_error_message_reaches_status_and_notification() {
    let (server, ctx) = signed_in().await;
    Mock::given(method("GET"))
        .and(path("/accounts"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({ "message": "Maintenance until 14:00" })),
        )
        .mount(&server)
        .await;

    assert!(ctx.accounts().fetch_all().await.is_err());

    let status = ctx.accounts().status_of(OperationKind::FETCH);
    assert_eq!(status.state, OperationState::Failed);
    assert_eq!(status.error_message.as_deref(), Some("Maintenance until 14:00"));
    let messages: Vec<String> = ctx
        .notifications()
        .visible()
        .iter()
        .map(|n| n.message.clone())
        .collect();
    assert_eq!(messages, vec!["Maintenance until 14:00".to_owned()]);
}

// ── Session end ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_session_end_clears_every_store() {
    let (server, ctx) = signed_in().await;
    mount_accounts(&server).await;
    ctx.start();

    ctx.accounts().fetch_all().await.unwrap();
    assert_eq!(ctx.accounts().all().len(), 1);

    ctx.session().clear();

    assert!(eventually(|| ctx.accounts().all().is_empty()).await);
    assert_eq!(
        ctx.accounts().status_of(OperationKind::FETCH).state,
        OperationState::Idle
    );
    ctx.shutdown();
}

#[tokio::test]
async fn test_logout_clears_stores_even_when_server_fails() {
    let (server, ctx) = signed_in().await;
    mount_accounts(&server).await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    ctx.accounts().fetch_all().await.unwrap();
    ctx.logout().await.unwrap();

    assert!(!ctx.session().is_authenticated());
    assert!(ctx.accounts().all().is_empty());
}

#[tokio::test]
async fn test_logout_during_fetch_keeps_stores_empty() {
    let (server, ctx) = signed_in().await;
    Mock::given(method("GET"))
        .and(path("/accounts"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": [account_json("a1", 10_000)] }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let fetch = ctx.accounts().fetch_all();
    let logout = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        ctx.logout().await
    };
    let (fetched, logged_out) = tokio::join!(fetch, logout);
    fetched.unwrap();
    logged_out.unwrap();

    assert!(!ctx.session().is_authenticated());
    assert!(ctx.accounts().all().is_empty());
    assert_eq!(
        ctx.accounts().status_of(OperationKind::FETCH).state,
        OperationState::Idle
    );
}

#[tokio::test]
async fn test_sign_out_then_sign_in_between_watcher_runs_still_clears() {
    let (server, ctx) = signed_in().await;
    mount_accounts(&server).await;
    ctx.start();

    ctx.accounts().fetch_all().await.unwrap();
    assert_eq!(ctx.accounts().all().len(), 1);

    // No await in between: the watcher sees a single change.
    ctx.session().clear();
    ctx.session().establish(
        CredentialPair {
            access_token: SecretString::from("tok-2".to_owned()),
            refresh_token: SecretString::from("ref-2".to_owned()),
            access_expiry: Utc::now() + chrono::Duration::minutes(15),
        },
        None,
    );

    assert!(eventually(|| ctx.accounts().all().is_empty()).await);
    assert!(ctx.session().is_authenticated());
    ctx.shutdown();
}
