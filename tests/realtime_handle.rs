// self
use session_lifecycle::{
	_preludet::*,
	realtime::{HandleOutcome, RealtimeHandle},
};

fn handle() -> (RealtimeHandle, Arc<RecordingTransport>) {
	let transport = Arc::new(RecordingTransport::default());

	(RealtimeHandle::new(transport.clone()), transport)
}

#[tokio::test]
async fn connect_is_idempotent_for_same_identity() {
	let (handle, transport) = handle();

	assert_eq!(handle.connect(&user("u1")).await.ok(), Some(HandleOutcome::Applied));
	assert_eq!(handle.connect(&user("u1")).await.ok(), Some(HandleOutcome::Unchanged));
	assert_eq!(transport.events(), vec![RealtimeEvent::Connect(user("u1"))]);
	assert_eq!(handle.connected_identity().await, Some(user("u1")));
}

#[tokio::test]
async fn connect_closes_previous_identity_first() {
	let (handle, transport) = handle();

	handle.connect(&user("u1")).await.expect("First connect should succeed.");
	handle.connect(&user("u2")).await.expect("Second connect should succeed.");

	assert_eq!(
		transport.events(),
		vec![
			RealtimeEvent::Connect(user("u1")),
			RealtimeEvent::Disconnect,
			RealtimeEvent::Connect(user("u2")),
		]
	);
	assert_eq!(handle.connected_identity().await, Some(user("u2")));
}

#[tokio::test]
async fn disconnect_without_connection_is_noop() {
	let (handle, transport) = handle();

	assert_eq!(handle.disconnect().await.ok(), Some(HandleOutcome::Unchanged));
	assert!(transport.events().is_empty());

	handle.connect(&user("u1")).await.expect("Connect should succeed.");

	assert_eq!(handle.disconnect().await.ok(), Some(HandleOutcome::Applied));
	assert_eq!(handle.disconnect().await.ok(), Some(HandleOutcome::Unchanged));
	assert_eq!(handle.connected_identity().await, None);
}

#[tokio::test]
async fn failed_connect_leaves_handle_disconnected() {
	let (handle, transport) = handle();

	handle.connect(&user("u1")).await.expect("Connect should succeed.");
	transport.fail_connects(true);

	assert!(handle.connect(&user("u2")).await.is_err());
	assert_eq!(handle.connected_identity().await, None);
	assert_eq!(
		transport.events(),
		vec![RealtimeEvent::Connect(user("u1")), RealtimeEvent::Disconnect]
	);
}

#[tokio::test]
async fn guards_are_evaluated_under_the_handle_lock() {
	let (handle, transport) = handle();

	assert_eq!(
		handle.connect_if(&user("u1"), || false).await.ok(),
		Some(HandleOutcome::Skipped)
	);
	assert!(transport.events().is_empty());

	handle.connect(&user("u1")).await.expect("Connect should succeed.");

	assert_eq!(handle.disconnect_if(|| false).await.ok(), Some(HandleOutcome::Skipped));
	assert_eq!(handle.connected_identity().await, Some(user("u1")));
}
