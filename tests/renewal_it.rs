// std
use std::time::Duration as StdDuration;
// self
use session_lifecycle::{
	_preludet::*,
	auth::{Credential, Session},
	error::CredentialError,
	session::{SessionState, SessionStatus},
};

const PERIOD: StdDuration = StdDuration::from_secs(600);

fn installed(harness: &Harness) -> Option<String> {
	harness.gateway.installed_credential().map(|credential| credential.expose().to_owned())
}

async fn advance_past(period: StdDuration) {
	tokio::time::sleep(period + StdDuration::from_secs(1)).await;
	tokio::task::yield_now().await;
}

#[tokio::test(start_paused = true)]
async fn renewal_installs_fresh_credential_each_period() {
	let harness = harness(ScriptedCredentialSource::signed_out("tok1"), ScriptedCheck::answering(false));

	harness.coordinator.handle_session(Session::signed_in(user("u1"))).await;
	harness.source.set_fallback(Ok(Some(Credential::new("tok2"))));

	assert_eq!(installed(&harness), Some("tok1".into()));

	advance_past(PERIOD).await;

	assert_eq!(installed(&harness), Some("tok2".into()));
	assert_eq!(harness.source.calls(), 2);
	assert_eq!(harness.source.force_fresh_calls(), 2);

	harness.source.set_fallback(Ok(Some(Credential::new("tok3"))));
	tokio::time::sleep(PERIOD).await;
	tokio::task::yield_now().await;

	assert_eq!(installed(&harness), Some("tok3".into()));
	assert_eq!(harness.coordinator.renewal_metrics().successes(), 2);
	assert_eq!(harness.coordinator.renewal_metrics().failures(), 0);
}

#[tokio::test(start_paused = true)]
async fn renewal_failure_leaves_session_untouched() {
	let harness = harness(ScriptedCredentialSource::signed_out("tok1"), ScriptedCheck::answering(true));

	harness.coordinator.handle_session(Session::signed_in(user("u1"))).await;
	harness.source.set_fallback(Err(CredentialError::source("provider unavailable")));

	let before = harness.coordinator.state();

	advance_past(PERIOD).await;

	assert_eq!(harness.coordinator.state(), before);
	assert_eq!(installed(&harness), Some("tok1".into()));
	assert_eq!(harness.coordinator.renewal_metrics().failures(), 1);
	assert!(harness.coordinator.renewal_active(), "A failed renewal should not stop the task.");

	harness.source.set_fallback(Ok(Some(Credential::new("tok2"))));
	tokio::time::sleep(PERIOD).await;
	tokio::task::yield_now().await;

	assert_eq!(installed(&harness), Some("tok2".into()));
	assert_eq!(harness.coordinator.state().status(), SessionStatus::Authenticated);
}

#[tokio::test(start_paused = true)]
async fn renewal_may_install_absent_credential() {
	let harness = harness(ScriptedCredentialSource::signed_out("tok1"), ScriptedCheck::answering(false));

	harness.coordinator.handle_session(Session::signed_in(user("u1"))).await;
	harness.source.set_fallback(Ok(None));
	advance_past(PERIOD).await;

	assert_eq!(installed(&harness), None);
	assert_eq!(harness.coordinator.state().status(), SessionStatus::Authenticated);
}

#[tokio::test(start_paused = true)]
async fn sign_out_stops_renewal() {
	let harness = harness(ScriptedCredentialSource::signed_out("tok1"), ScriptedCheck::answering(false));

	harness.coordinator.handle_session(Session::signed_in(user("u1"))).await;
	harness.coordinator.handle_session(Session::signed_out()).await;

	tokio::time::sleep(PERIOD * 6).await;
	tokio::task::yield_now().await;

	assert_eq!(harness.source.calls(), 1);
	assert_eq!(harness.coordinator.renewal_metrics().attempts(), 0);
	assert_eq!(installed(&harness), None);
	assert_eq!(harness.coordinator.state(), SessionState::Unauthenticated);
}

#[tokio::test(start_paused = true)]
async fn identity_switch_keeps_single_renewal_schedule() {
	let harness = harness(ScriptedCredentialSource::signed_out("tok"), ScriptedCheck::answering(false));

	harness.coordinator.handle_session(Session::signed_in(user("u1"))).await;
	tokio::time::sleep(PERIOD / 2).await;
	harness.coordinator.handle_session(Session::signed_in(user("u2"))).await;

	// Only the second schedule is alive; it first fires one full period after the switch.
	tokio::time::sleep(PERIOD / 2 + StdDuration::from_secs(1)).await;
	tokio::task::yield_now().await;

	assert_eq!(harness.coordinator.renewal_metrics().attempts(), 0);

	advance_past(PERIOD / 2).await;

	assert_eq!(harness.coordinator.renewal_metrics().attempts(), 1);
	assert_eq!(harness.source.calls(), 3);
}
