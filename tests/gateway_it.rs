// std
use std::time::Duration as StdDuration;
// crates.io
use httpmock::prelude::*;
// self
use session_lifecycle::{
	_preludet::*,
	auth::{Credential, Session},
	authz::AuthorizationCheck,
	error::AuthorizationError,
	http::{RequestGateway, UnauthorizedPolicy},
	session::{SessionCoordinator, SessionState, SessionStatus},
};

fn gateway(server: &MockServer, policy: UnauthorizedPolicy) -> Arc<RequestGateway> {
	test_gateway(&server.url("/api/"), policy)
}

async fn coordinator(
	gateway: Arc<RequestGateway>,
	source: Arc<ScriptedCredentialSource>,
	transport: Arc<RecordingTransport>,
) -> SessionCoordinator {
	let config = test_config(gateway.api_base().as_str());

	SessionCoordinator::bootstrap_with_gateway(&config, source, gateway, transport).await
}

async fn wait_for_calls(source: &ScriptedCredentialSource, expected: usize) {
	for _ in 0..200 {
		if source.calls() >= expected {
			return;
		}

		tokio::time::sleep(StdDuration::from_millis(10)).await;
	}
}

async fn mock_admin(server: &MockServer, admin: bool) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/admin/check");
			then.status(200)
				.header("content-type", "application/json")
				.body(format!("{{\"admin\":{admin}}}"));
		})
		.await
}

#[tokio::test]
async fn sign_in_and_sign_out_against_backend() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/admin/check").header("authorization", "Bearer tok1");
			then.status(200).header("content-type", "application/json").body("{\"admin\":true}");
		})
		.await;
	let source = Arc::new(ScriptedCredentialSource::signed_in("u1", "tok1"));
	let transport = Arc::new(RecordingTransport::default());
	let coordinator = coordinator(
		gateway(&server, UnauthorizedPolicy::LogOnly),
		source.clone(),
		transport.clone(),
	)
	.await;

	mock.assert_async().await;

	assert_eq!(
		coordinator.state(),
		SessionState::Authenticated { identity: Some(user("u1")), privileged: true }
	);
	assert!(coordinator.authorization().status().is_privileged);
	assert_eq!(transport.events(), vec![RealtimeEvent::Connect(user("u1"))]);

	coordinator.handle_session(Session::signed_out()).await;

	assert_eq!(coordinator.state(), SessionState::Unauthenticated);
	assert!(coordinator.gateway().installed_credential().is_none());
	assert!(coordinator.authorization().status().is_reset());
	assert_eq!(
		transport.events(),
		vec![RealtimeEvent::Connect(user("u1")), RealtimeEvent::Disconnect]
	);
	assert!(!coordinator.renewal_active());
}

#[tokio::test]
async fn non_admin_backend_answer_authenticates_without_privilege() {
	let server = MockServer::start_async().await;
	let _mock = mock_admin(&server, false).await;
	let coordinator = coordinator(
		gateway(&server, UnauthorizedPolicy::LogOnly),
		Arc::new(ScriptedCredentialSource::signed_in("u1", "tok1")),
		Arc::new(RecordingTransport::default()),
	)
	.await;

	assert_eq!(
		coordinator.state(),
		SessionState::Authenticated { identity: Some(user("u1")), privileged: false }
	);
}

#[tokio::test]
async fn bootstrap_degrades_when_backend_is_unreachable() {
	let transport = Arc::new(RecordingTransport::default());
	let coordinator = SessionCoordinator::bootstrap(
		test_config("http://127.0.0.1:9/api/"),
		Arc::new(ScriptedCredentialSource::signed_in("u1", "tok1")),
		transport.clone(),
	)
	.await
	.expect("Bootstrap should succeed.");

	assert_eq!(coordinator.state().status(), SessionStatus::Degraded);
	assert_eq!(
		coordinator.gateway().installed_credential().map(|credential| credential.expose().to_owned()),
		Some("tok1".into())
	);
	assert!(coordinator.authorization().status().is_reset());
	assert!(transport.events().is_empty());
	assert!(coordinator.renewal_active());
}

#[tokio::test]
async fn admin_check_surfaces_backend_message() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/admin/check");
			then.status(403)
				.header("content-type", "application/json")
				.body("{\"message\":\"Unauthorized - you must be an admin\"}");
		})
		.await;
	let err = gateway(&server, UnauthorizedPolicy::LogOnly)
		.check()
		.await
		.expect_err("Forbidden check should fail.");

	mock.assert_async().await;

	match err {
		AuthorizationError::Status { status, message } => {
			assert_eq!(status, 403);
			assert_eq!(message, "Unauthorized - you must be an admin");
		},
		other => panic!("Expected a status error, got {other:?}."),
	}
}

#[tokio::test]
async fn admin_check_falls_back_to_generic_message() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/admin/check");
			then.status(502).body("Bad gateway");
		})
		.await;
	let err = gateway(&server, UnauthorizedPolicy::LogOnly)
		.check()
		.await
		.expect_err("Upstream failure should fail the check.");

	assert_eq!(err.status_message(), "Failed to check admin status");
}

#[tokio::test]
async fn admin_check_reports_decode_path() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/admin/check");
			then.status(200).header("content-type", "application/json").body("{\"admin\":\"yes\"}");
		})
		.await;
	let err = gateway(&server, UnauthorizedPolicy::LogOnly)
		.check()
		.await
		.expect_err("Malformed body should fail decoding.");

	match err {
		AuthorizationError::Decode { source } => assert_eq!(source.path().to_string(), "admin"),
		other => panic!("Expected a decode error, got {other:?}."),
	}
}

#[tokio::test]
async fn unreachable_backend_is_transport_failure() {
	let gateway = RequestGateway::from_config(&test_config("http://127.0.0.1:9/api/"))
		.expect("Gateway should build.");
	let err = gateway.check().await.expect_err("Unreachable backend should fail.");

	assert!(matches!(err, AuthorizationError::Transport(_)));
	assert_eq!(gateway.metrics().requests(), 1);
	assert_eq!(gateway.metrics().transport_failures(), 1);
}

#[tokio::test]
async fn unauthorized_response_is_logged_only_by_default() {
	let server = MockServer::start_async().await;
	let _admin = mock_admin(&server, false).await;
	let songs = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/songs").header("authorization", "Bearer tok1");
			then.status(401);
		})
		.await;
	let source = Arc::new(ScriptedCredentialSource::signed_in("u1", "tok1"));
	let coordinator = coordinator(
		gateway(&server, UnauthorizedPolicy::LogOnly),
		source.clone(),
		Arc::new(RecordingTransport::default()),
	)
	.await;
	let response = coordinator.gateway().get("songs").await.expect("Request should complete.");

	songs.assert_async().await;

	assert_eq!(response.status().as_u16(), 401);
	assert_eq!(coordinator.gateway().metrics().unauthorized(), 1);

	tokio::time::sleep(StdDuration::from_millis(100)).await;

	assert_eq!(source.calls(), 1);
	assert_eq!(coordinator.renewal_metrics().signalled(), 0);
	assert_eq!(coordinator.state().status(), SessionStatus::Authenticated);
}

#[tokio::test]
async fn unauthorized_response_requests_renewal_when_configured() {
	let server = MockServer::start_async().await;
	let _admin = mock_admin(&server, false).await;
	let _songs = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/songs");
			then.status(401);
		})
		.await;
	let source = Arc::new(ScriptedCredentialSource::signed_in("u1", "tok1"));
	let coordinator = coordinator(
		gateway(&server, UnauthorizedPolicy::RequestRenewal),
		source.clone(),
		Arc::new(RecordingTransport::default()),
	)
	.await;

	tokio::task::yield_now().await;
	source.set_fallback(Ok(Some(Credential::new("tok2"))));
	coordinator.gateway().get("/songs").await.expect("Request should complete.");
	wait_for_calls(&source, 2).await;

	assert_eq!(source.calls(), 2);
	assert_eq!(coordinator.renewal_metrics().signalled(), 1);
	assert_eq!(
		coordinator.gateway().installed_credential().map(|credential| credential.expose().to_owned()),
		Some("tok2".into())
	);
	assert_eq!(coordinator.state().status(), SessionStatus::Authenticated);
}

#[tokio::test]
async fn unauthorized_response_while_signed_out_does_not_renew_later() {
	let server = MockServer::start_async().await;
	let _admin = mock_admin(&server, false).await;
	let _songs = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/songs");
			then.status(401);
		})
		.await;
	let source = Arc::new(ScriptedCredentialSource::signed_out("tok1"));
	let coordinator = coordinator(
		gateway(&server, UnauthorizedPolicy::RequestRenewal),
		source.clone(),
		Arc::new(RecordingTransport::default()),
	)
	.await;

	coordinator.gateway().get("songs").await.expect("Request should complete.");

	assert_eq!(coordinator.gateway().metrics().unauthorized(), 1);
	assert_eq!(source.calls(), 0);

	coordinator.handle_session(Session::signed_in(user("u1"))).await;
	tokio::time::sleep(StdDuration::from_millis(200)).await;

	assert_eq!(source.calls(), 1);
	assert_eq!(coordinator.renewal_metrics().attempts(), 0);
	assert_eq!(coordinator.renewal_metrics().signalled(), 0);
	assert_eq!(coordinator.state().status(), SessionStatus::Authenticated);
}
