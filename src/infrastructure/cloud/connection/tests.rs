use super::*;

use std::time::Duration;

use tokio::sync::mpsc;

use crate::domain::Message;
use crate::infrastructure::cloud::connectivity::ConnectivityState;
use crate::infrastructure::monitoring::InMemoryMetrics;
use crate::port::outbound::directory::EmptyDirectory;
use crate::port::outbound::token::StaticTokenSource;
use crate::port::Protocol;
use crate::testkit;
use crate::testkit::transport::{MockScript, MockTransport, MockTransportProvider};

// -- Helpers --------------------------------------------------------------

struct Harness {
    provider: Arc<MockTransportProvider>,
    factory: ConnectionFactory,
    monitor: Arc<ConnectivityStateMachine>,
}

impl Harness {
    fn new() -> Self {
        let provider = Arc::new(MockTransportProvider::new());
        let factory = ConnectionFactory::new(
            &testkit::config::upstream(Protocol::Amqp),
            testkit::config::token(),
            testkit::domain::gateway(),
            Arc::new(StaticTokenSource::new(testkit::domain::token_valid_for_mins(60))),
            provider.clone(),
            Arc::new(EmptyDirectory),
        )
        .unwrap();
        let monitor = Arc::new(ConnectivityStateMachine::new(
            testkit::config::connectivity(),
            testkit::domain::gateway(),
            Arc::new(InMemoryMetrics::new()),
        ));
        Self {
            provider,
            factory,
            monitor,
        }
    }

    async fn connect(
        &self,
        token_mins: i64,
    ) -> (
        Result<IdentityConnection>,
        mpsc::UnboundedReceiver<StatusChange>,
    ) {
        let (handler, rx) = testkit::status::channel_handler();
        let path = CredentialPath::Direct(testkit::domain::credentials(leaf(), token_mins));
        let result =
            IdentityConnection::create(path, &self.factory, Arc::clone(&self.monitor), handler)
                .await;
        (result, rx)
    }

    fn client(&self, index: usize) -> Arc<MockTransport> {
        Arc::clone(&self.provider.created()[index])
    }
}

fn leaf() -> Identity {
    testkit::domain::device("leaf-1")
}

fn fresh_credentials() -> TokenCredentials {
    testkit::domain::credentials(leaf(), 60)
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

// -- Create ---------------------------------------------------------------

#[tokio::test]
async fn test_create_opens_client() {
    let h = Harness::new();
    let (conn, _rx) = h.connect(60).await;
    let conn = conn.unwrap();

    assert!(conn.is_active());
    assert!(conn.active_client().is_some());
    assert_eq!(conn.identity(), &leaf());
    assert!(!conn.credential_path().is_delegated());

    let mock = h.client(0);
    assert_eq!(mock.open_count(), 1);
    assert_eq!(mock.handler_count(), 1);
    assert_eq!(mock.auth().identity(), &leaf());
}

#[tokio::test]
async fn test_create_rejected_identity_is_auth_failure() {
    let h = Harness::new();
    h.provider
        .push(MockScript::open_fails(TransportError::Unauthorized("revoked".into())));

    let (conn, _rx) = h.connect(60).await;
    assert!(matches!(conn, Err(Error::AuthFailure { .. })));
}

#[tokio::test]
async fn test_create_other_failure_is_open_failure() {
    let h = Harness::new();
    h.provider
        .push(MockScript::open_fails(TransportError::Communication("refused".into())));

    let (conn, _rx) = h.connect(60).await;
    assert!(matches!(
        conn,
        Err(Error::TransportOpenFailure {
            source: TransportError::Communication(_),
            ..
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_create_open_timeout_is_open_failure() {
    let h = Harness::new();
    h.provider.push(MockScript::hanging_open());

    let (conn, _rx) = h.connect(60).await;
    assert!(matches!(
        conn,
        Err(Error::TransportOpenFailure {
            source: TransportError::Timeout,
            ..
        })
    ));
    assert_eq!(h.client(0).close_count(), 1);
}

// -- Status ---------------------------------------------------------------

#[tokio::test]
async fn test_status_events_are_mapped() {
    let h = Harness::new();
    let (conn, mut rx) = h.connect(60).await;
    let conn = conn.unwrap();
    let mock = h.client(0);

    mock.emit(ConnectionStatus::Connected, ChangeReason::ConnectionOk);
    let change = rx.recv().await.unwrap();
    assert_eq!(change.identity, leaf());
    assert_eq!(change.status, CloudConnectionStatus::ConnectionEstablished);

    mock.emit(
        ConnectionStatus::DisconnectedRetrying,
        ChangeReason::CommunicationError,
    );
    assert!(rx.try_recv().is_err());
    assert!(conn.is_active());

    mock.emit(ConnectionStatus::Disconnected, ChangeReason::ExpiredToken);
    let change = rx.recv().await.unwrap();
    assert_eq!(change.status, CloudConnectionStatus::DisconnectedTokenExpired);
    assert!(!conn.is_active());
    assert!(conn.active_client().is_none());
}

#[tokio::test]
async fn test_active_client_reports_outcomes() {
    let h = Harness::new();
    let (conn, _rx) = h.connect(60).await;
    let conn = conn.unwrap();
    h.client(0).push_call_results(vec![
        Err(TransportError::Timeout),
        Err(TransportError::Timeout),
    ]);

    let before = conn.last_used();
    let client = conn.active_client().unwrap();
    assert!(conn.last_used() >= before);

    assert!(client.send(Message::new("x")).await.is_err());
    assert_eq!(h.monitor.state(), ConnectivityState::Trying);

    // The raw client bypasses reporting.
    let raw = conn.raw_client().unwrap();
    assert!(raw.send(Message::new("y")).await.is_err());
    assert_eq!(h.monitor.state(), ConnectivityState::Trying);
}

// -- Token update: fast path ----------------------------------------------

#[tokio::test]
async fn test_update_token_serves_pending_request_without_reconnect() {
    let h = Harness::new();
    // Valid, but inside the 5 minute buffer.
    let (conn, mut rx) = h.connect(2).await;
    let conn = conn.unwrap();

    // The transport's auth layer asks for a token.
    let source = Arc::clone(h.client(0).auth().source());
    let waiter = tokio::spawn(async move { source.token().await.unwrap() });

    let change = rx.recv().await.unwrap();
    assert_eq!(change.status, CloudConnectionStatus::TokenNearExpiry);
    assert!(conn.token_coordinator().has_pending());

    let fresh = fresh_credentials();
    let client = conn.update_token(fresh.clone()).await.unwrap();

    assert_eq!(waiter.await.unwrap(), fresh.token());
    assert_eq!(h.provider.created_count(), 1, "no new client");
    assert_eq!(h.client(0).close_count(), 0);
    assert!(client.is_active());
    assert!(!conn.token_coordinator().has_pending());
}

#[tokio::test(start_paused = true)]
async fn test_expired_token_with_pending_request_reconnects() {
    let h = Harness::new();
    let (conn, mut rx) = h.connect(2).await;
    let conn = conn.unwrap();

    let source = Arc::clone(h.client(0).auth().source());
    let waiter = tokio::spawn(async move { source.token().await.unwrap() });
    rx.recv().await.unwrap();

    let expired = TokenCredentials::new(leaf(), testkit::domain::expired_token());
    conn.update_token(expired).await.unwrap();

    assert_eq!(h.provider.created_count(), 2);
    assert_eq!(h.client(0).close_count(), 1);

    // The waiter rejects the expired token and asks again.
    let again = rx.recv().await.unwrap();
    assert_eq!(again.status, CloudConnectionStatus::TokenNearExpiry);

    let fresh = fresh_credentials();
    conn.update_token(fresh.clone()).await.unwrap();
    assert_eq!(waiter.await.unwrap(), fresh.token());
    assert_eq!(h.provider.created_count(), 2, "served by the pending request");
}

#[tokio::test]
async fn test_swap_releases_waiters_of_previous_client() {
    let h = Harness::new();
    let (conn, mut rx) = h.connect(2).await;
    let conn = conn.unwrap();

    let source = Arc::clone(h.client(0).auth().source());
    let waiter = tokio::spawn(async move { source.token().await.unwrap() });
    rx.recv().await.unwrap();

    h.client(0)
        .emit(ConnectionStatus::Disconnected, ChangeReason::CommunicationError);
    rx.recv().await.unwrap();
    assert!(!conn.is_active());

    let fresh = fresh_credentials();
    conn.update_token(fresh.clone()).await.unwrap();

    assert_eq!(h.provider.created_count(), 2);
    assert_eq!(waiter.await.unwrap(), fresh.token());
    assert!(!conn.token_coordinator().has_pending());
    assert_eq!(conn.token_coordinator().current_token(), fresh.token());
}

// -- Token update: slow path ----------------------------------------------

#[tokio::test]
async fn test_update_token_without_pending_request_swaps_client() {
    let h = Harness::new();
    let (conn, mut rx) = h.connect(60).await;
    let conn = conn.unwrap();

    let fresh = fresh_credentials();
    let client = conn.update_token(fresh.clone()).await.unwrap();

    assert_eq!(h.provider.created_count(), 2);
    let (old, new) = (h.client(0), h.client(1));
    assert_eq!(old.close_count(), 1);
    assert_eq!(new.open_count(), 1);
    assert!(client.is_active());
    assert_eq!(conn.token_coordinator().current_token(), fresh.token());

    // The replaced client can no longer speak for the identity.
    old.emit(ConnectionStatus::Disconnected, ChangeReason::ClientClose);
    assert!(rx.try_recv().is_err());
    assert!(conn.is_active());

    new.emit(ConnectionStatus::Connected, ChangeReason::ConnectionOk);
    assert_eq!(
        rx.recv().await.unwrap().status,
        CloudConnectionStatus::ConnectionEstablished
    );
}

#[tokio::test]
async fn test_failed_swap_keeps_previous_client() {
    let h = Harness::new();
    let (conn, mut rx) = h.connect(60).await;
    let conn = conn.unwrap();
    h.provider
        .push(MockScript::open_fails(TransportError::Communication("down".into())));

    let result = conn.update_token(fresh_credentials()).await;
    assert!(matches!(result, Err(Error::TransportOpenFailure { .. })));

    let old = h.client(0);
    assert_eq!(old.close_count(), 0);
    assert!(conn.is_active());
    assert!(conn.active_client().is_some());

    // Callbacks are enabled again for the surviving client.
    old.emit(ConnectionStatus::Disconnected, ChangeReason::ExpiredToken);
    assert_eq!(
        rx.recv().await.unwrap().status,
        CloudConnectionStatus::DisconnectedTokenExpired
    );
}

#[tokio::test(start_paused = true)]
async fn test_callbacks_suppressed_while_swapping() {
    let h = Harness::new();
    let (conn, mut rx) = h.connect(60).await;
    let conn = Arc::new(conn.unwrap());
    h.provider.push(MockScript::hanging_open());

    let swap = {
        let conn = Arc::clone(&conn);
        tokio::spawn(async move { conn.update_token(fresh_credentials()).await })
    };
    settle().await;

    h.client(0)
        .emit(ConnectionStatus::Connected, ChangeReason::ConnectionOk);
    assert!(rx.try_recv().is_err());

    // The hanging open times out and the old client stays current.
    assert!(swap.await.unwrap().is_err());
    h.client(0)
        .emit(ConnectionStatus::Connected, ChangeReason::ConnectionOk);
    assert_eq!(
        rx.recv().await.unwrap().status,
        CloudConnectionStatus::ConnectionEstablished
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_update_reenables_callbacks() {
    let h = Harness::new();
    let (conn, mut rx) = h.connect(60).await;
    let conn = conn.unwrap();
    h.provider.push(MockScript::hanging_open());

    let cancelled =
        tokio::time::timeout(Duration::from_millis(10), conn.update_token(fresh_credentials()))
            .await;
    assert!(cancelled.is_err());

    h.client(0)
        .emit(ConnectionStatus::Disconnected, ChangeReason::ExpiredToken);
    assert_eq!(
        rx.recv().await.unwrap().status,
        CloudConnectionStatus::DisconnectedTokenExpired
    );
    assert!(!conn.is_active());
}

#[tokio::test]
async fn test_update_token_rejects_foreign_credentials() {
    let h = Harness::new();
    let (conn, _rx) = h.connect(60).await;
    let conn = conn.unwrap();

    let foreign = testkit::domain::credentials(testkit::domain::device("other"), 60);
    assert!(matches!(
        conn.update_token(foreign).await,
        Err(Error::AuthFailure { .. })
    ));
    assert_eq!(h.provider.created_count(), 1);
}

// -- Close ----------------------------------------------------------------

#[tokio::test]
async fn test_close_reports_whether_a_client_was_closed() {
    let h = Harness::new();
    let (conn, mut rx) = h.connect(60).await;
    let conn = conn.unwrap();

    assert!(conn.close().await);
    assert!(!conn.close().await);
    assert!(!conn.is_active());
    assert_eq!(h.client(0).close_count(), 1);

    h.client(0)
        .emit(ConnectionStatus::Disabled, ChangeReason::ClientClose);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_update_token_after_close_does_not_reopen() {
    let h = Harness::new();
    let (conn, _rx) = h.connect(60).await;
    let conn = conn.unwrap();

    assert!(conn.close().await);
    let result = conn.update_token(fresh_credentials()).await;

    assert!(matches!(result, Err(Error::NotConnected(_))));
    assert_eq!(h.provider.created_count(), 1);
    assert!(!conn.is_active());
}

#[tokio::test]
async fn test_update_queued_behind_close_does_not_reopen() {
    let h = Harness::new();
    let (conn, _rx) = h.connect(60).await;
    let conn = Arc::new(conn.unwrap());

    // Hold the swap lock so the close queues ahead of the update.
    let guard = conn.swap_lock.lock().await;
    let close = {
        let conn = Arc::clone(&conn);
        tokio::spawn(async move { conn.close().await })
    };
    settle().await;
    let update = {
        let conn = Arc::clone(&conn);
        tokio::spawn(async move { conn.update_token(fresh_credentials()).await })
    };
    settle().await;
    drop(guard);

    assert!(close.await.unwrap());
    assert!(matches!(update.await.unwrap(), Err(Error::NotConnected(_))));
    assert_eq!(h.provider.created_count(), 1);
    assert!(!conn.is_active());
}
