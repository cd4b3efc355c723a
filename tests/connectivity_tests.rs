//! Link health tests: decorated clients, the state machine, and probing.

use std::sync::Arc;
use std::time::Duration;

use tokio_test::{assert_err, assert_ok};

use cloudlink::domain::Message;
use cloudlink::error::{Error, TransportError};
use cloudlink::infrastructure::cloud::{
    ConnectivityAwareTransport, ConnectivityEvent, ConnectivityState, ConnectivityStateMachine,
};
use cloudlink::infrastructure::monitoring::InMemoryMetrics;
use cloudlink::port::outbound::token::StaticTokenSource;
use cloudlink::port::{AuthMethod, TransportClient};
use cloudlink::testkit;
use cloudlink::testkit::probe::ScriptedProbe;
use cloudlink::testkit::transport::{MockScript, MockTransport};

fn monitor(initial: ConnectivityState) -> (Arc<ConnectivityStateMachine>, Arc<InMemoryMetrics>) {
    let metrics = Arc::new(InMemoryMetrics::new());
    let machine = ConnectivityStateMachine::with_initial_state(
        testkit::config::connectivity(),
        testkit::domain::gateway(),
        metrics.clone(),
        initial,
    );
    (Arc::new(machine), metrics)
}

fn mock(results: Vec<Result<(), TransportError>>) -> Arc<MockTransport> {
    let auth = AuthMethod::Token {
        identity: testkit::domain::device("sensor"),
        source: Arc::new(StaticTokenSource::new(testkit::domain::token_valid_for_mins(60))),
    };
    Arc::new(MockTransport::new(
        auth,
        MockScript::default().with_call_results(results),
    ))
}

#[tokio::test]
async fn test_outage_and_recovery_through_decorated_client() {
    let (m, metrics) = monitor(ConnectivityState::Connected);
    let mut events = m.subscribe();
    let inner = mock(vec![
        Err(TransportError::Timeout),
        Err(TransportError::Communication("reset".into())),
        Ok(()),
    ]);
    let client = ConnectivityAwareTransport::wrap(inner.clone(), Arc::clone(&m));

    assert_err!(client.send(Message::new("a")).await);
    assert_eq!(m.state(), ConnectivityState::Trying);

    assert_err!(client.get_metadata().await);
    assert_eq!(m.state(), ConnectivityState::Disconnected);
    assert_eq!(
        assert_ok!(events.try_recv()),
        ConnectivityEvent::DeviceDisconnected
    );

    assert_ok!(client.send(Message::new("b")).await);
    assert_eq!(m.state(), ConnectivityState::Connected);
    assert_eq!(
        assert_ok!(events.try_recv()),
        ConnectivityEvent::DeviceConnected
    );

    let stats = metrics.stats(&testkit::domain::gateway());
    assert_eq!(stats.offline_count, 1);
    assert_eq!(stats.recoveries, 1);
    assert_eq!(inner.call_count(), 3);
    assert_eq!(inner.sent().len(), 1);
}

#[tokio::test]
async fn test_auth_failures_do_not_move_the_machine() {
    let (m, _) = monitor(ConnectivityState::Connected);
    let client = ConnectivityAwareTransport::wrap(
        mock(vec![
            Err(TransportError::Unauthorized("revoked".into())),
            Err(TransportError::TokenExpired),
        ]),
        Arc::clone(&m),
    );

    assert_err!(client.send(Message::new("a")).await);
    assert_err!(client.send(Message::new("b")).await);

    assert_eq!(m.state(), ConnectivityState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_probe_loop_recovers_disconnected_link() {
    let (m, _) = monitor(ConnectivityState::Disconnected);
    let mut events = m.subscribe();
    let probe = Arc::new(ScriptedProbe::new().with_results(vec![
        Err(Error::Transport(TransportError::Timeout)),
        Ok(()),
    ]));
    let handle = m.start(probe.clone());

    let event = tokio::time::timeout(Duration::from_secs(600), events.recv()).await;

    assert_eq!(
        assert_ok!(assert_ok!(event)),
        ConnectivityEvent::DeviceConnected
    );
    assert_eq!(probe.count(), 2);
    assert_eq!(m.state(), ConnectivityState::Connected);
    handle.abort();
}
