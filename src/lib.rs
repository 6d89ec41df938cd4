//! Client-side session lifecycle coordinator: keeps a bearer credential fresh, gates an
//! authorization check and a realtime connection on it, and tears both down consistently as
//! sign-in state changes.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod authz;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod realtime;
pub mod session;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and scripted collaborators for integration tests; enabled via
	//! `cfg(test)` or the `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::{
		collections::VecDeque,
		sync::atomic::{AtomicBool, AtomicUsize, Ordering},
	};
	// crates.io
	use tokio::sync::{Notify, watch};
	// self
	use crate::{
		auth::{Credential, CredentialFuture, CredentialSource, Session, SessionFeed, UserId},
		authz::{AuthorizationCache, AuthorizationCheck, AuthorizationFuture},
		config::CoordinatorConfig,
		error::{AuthorizationError, ConnectionError, CredentialError},
		http::{RequestGateway, UnauthorizedPolicy},
		realtime::{RealtimeFuture, RealtimeHandle, RealtimeTransport},
		session::SessionCoordinator,
	};

	type TokenResult = Result<Option<Credential>, CredentialError>;

	/// Parses a user identifier fixture.
	pub fn user(id: &str) -> UserId {
		UserId::new(id).expect("User fixture should be a valid identifier.")
	}

	/// Builds a configuration rooted at `api_base` with default renewal settings.
	pub fn test_config(api_base: &str) -> CoordinatorConfig {
		CoordinatorConfig::builder("pk_test_fixture")
			.api_base(Url::parse(api_base).expect("Fixture API base should parse."))
			.build()
			.expect("Fixture configuration should build.")
	}

	/// Builds a reqwest client that accepts the self-signed certificates produced by `httpmock`
	/// during tests.
	pub fn test_reqwest_client() -> ReqwestClient {
		ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.")
	}

	/// Gateway rooted at `api_base`, backed by [`test_reqwest_client`].
	pub fn test_gateway(api_base: &str, policy: UnauthorizedPolicy) -> Arc<RequestGateway> {
		let api_base = Url::parse(api_base).expect("Fixture API base should parse.");

		Arc::new(
			RequestGateway::with_client(test_reqwest_client(), api_base)
				.with_unauthorized_policy(policy),
		)
	}

	/// Credential source driven entirely by the test.
	pub struct ScriptedCredentialSource {
		feed: SessionFeed,
		tokens: Mutex<VecDeque<TokenResult>>,
		fallback: Mutex<TokenResult>,
		gate: Mutex<Option<Arc<Notify>>>,
		calls: AtomicUsize,
		forced: AtomicUsize,
	}
	impl ScriptedCredentialSource {
		/// Creates a source reporting `session`; every fetch yields `fallback` unless scripted.
		pub fn new(session: Session, fallback: TokenResult) -> Self {
			Self {
				feed: SessionFeed::new(session),
				tokens: Default::default(),
				fallback: Mutex::new(fallback),
				gate: Default::default(),
				calls: Default::default(),
				forced: Default::default(),
			}
		}

		/// Signed-in source for `id` that always yields `token`.
		pub fn signed_in(id: &str, token: &str) -> Self {
			Self::new(Session::signed_in(user(id)), Ok(Some(Credential::new(token))))
		}

		/// Signed-out source that yields `token` once signed in.
		pub fn signed_out(token: &str) -> Self {
			Self::new(Session::signed_out(), Ok(Some(Credential::new(token))))
		}

		/// Queues the result of the next unscripted fetch.
		pub fn push_token(&self, result: TokenResult) {
			self.tokens.lock().push_back(result);
		}

		/// Replaces the result returned once the queue is empty.
		pub fn set_fallback(&self, result: TokenResult) {
			*self.fallback.lock() = result;
		}

		/// Makes the next fetch wait until the returned notifier fires.
		pub fn hold_next_fetch(&self) -> Arc<Notify> {
			let gate = Arc::new(Notify::new());

			*self.gate.lock() = Some(gate.clone());

			gate
		}

		/// Publishes a new snapshot to subscribers.
		pub fn publish(&self, session: Session) -> bool {
			self.feed.publish(session)
		}

		/// Subscribes to snapshots.
		pub fn subscribe(&self) -> watch::Receiver<Session> {
			self.feed.subscribe()
		}

		/// Number of `get_token` calls.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}

		/// Number of `get_token` calls that asked to bypass the cache.
		pub fn force_fresh_calls(&self) -> usize {
			self.forced.load(Ordering::SeqCst)
		}
	}
	impl CredentialSource for ScriptedCredentialSource {
		fn is_signed_in(&self) -> bool {
			self.feed.current().is_signed_in()
		}

		fn current_identity(&self) -> Option<UserId> {
			self.feed.current().identity().cloned()
		}

		fn get_token(&self, force_fresh: bool) -> CredentialFuture<'_> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			if force_fresh {
				self.forced.fetch_add(1, Ordering::SeqCst);
			}

			let gate = self.gate.lock().take();
			let result = self.tokens.lock().pop_front().unwrap_or_else(|| self.fallback.lock().clone());

			Box::pin(async move {
				if let Some(gate) = gate {
					gate.notified().await;
				}

				result
			})
		}
	}

	/// Authorization check answering from a script.
	#[derive(Default)]
	pub struct ScriptedCheck {
		results: Mutex<VecDeque<Result<bool, (u16, String)>>>,
		fallback: Mutex<Option<Result<bool, (u16, String)>>>,
		gate: Mutex<Option<Arc<Notify>>>,
		calls: AtomicUsize,
	}
	impl ScriptedCheck {
		/// Check that always answers `privileged`.
		pub fn answering(privileged: bool) -> Self {
			let check = Self::default();

			*check.fallback.lock() = Some(Ok(privileged));

			check
		}

		/// Check that always fails with `status`.
		pub fn failing(status: u16, message: &str) -> Self {
			let check = Self::default();

			*check.fallback.lock() = Some(Err((status, message.to_owned())));

			check
		}

		/// Queues a successful answer.
		pub fn push_ok(&self, privileged: bool) {
			self.results.lock().push_back(Ok(privileged));
		}

		/// Queues a status failure.
		pub fn push_status_error(&self, status: u16, message: &str) {
			self.results.lock().push_back(Err((status, message.to_owned())));
		}

		/// Makes the next check wait until the returned notifier fires.
		pub fn hold_next_check(&self) -> Arc<Notify> {
			let gate = Arc::new(Notify::new());

			*self.gate.lock() = Some(gate.clone());

			gate
		}

		/// Number of checks issued.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl AuthorizationCheck for ScriptedCheck {
		fn check(&self) -> AuthorizationFuture<'_> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let next = self
				.results
				.lock()
				.pop_front()
				.or_else(|| self.fallback.lock().clone())
				.unwrap_or(Ok(false));
			let gate = self.gate.lock().take();

			Box::pin(async move {
				if let Some(gate) = gate {
					gate.notified().await;
				}

				next.map_err(|(status, message)| AuthorizationError::Status { status, message })
			})
		}
	}

	/// Operation observed by a [`RecordingTransport`].
	#[derive(Clone, Debug, PartialEq, Eq)]
	pub enum RealtimeEvent {
		/// Connection opened for the identity.
		Connect(UserId),
		/// Connection closed.
		Disconnect,
	}

	/// Realtime transport that records every call.
	#[derive(Default)]
	pub struct RecordingTransport {
		events: Mutex<Vec<RealtimeEvent>>,
		fail_connect: AtomicBool,
	}
	impl RecordingTransport {
		/// Every call observed so far.
		pub fn events(&self) -> Vec<RealtimeEvent> {
			self.events.lock().clone()
		}

		/// Number of successful connects.
		pub fn connects(&self) -> usize {
			self.events.lock().iter().filter(|event| matches!(event, RealtimeEvent::Connect(_))).count()
		}

		/// Makes subsequent connects fail.
		pub fn fail_connects(&self, fail: bool) {
			self.fail_connect.store(fail, Ordering::SeqCst);
		}
	}
	impl RealtimeTransport for RecordingTransport {
		fn connect<'a>(&'a self, identity: &'a UserId) -> RealtimeFuture<'a> {
			Box::pin(async move {
				if self.fail_connect.load(Ordering::SeqCst) {
					return Err(ConnectionError::Connect { message: "socket refused".into() });
				}

				self.events.lock().push(RealtimeEvent::Connect(identity.clone()));

				Ok(())
			})
		}

		fn disconnect(&self) -> RealtimeFuture<'_> {
			Box::pin(async move {
				self.events.lock().push(RealtimeEvent::Disconnect);

				Ok(())
			})
		}
	}

	/// Coordinator wired to scripted collaborators.
	pub struct Harness {
		/// Coordinator under test.
		pub coordinator: SessionCoordinator,
		/// Scripted identity provider.
		pub source: Arc<ScriptedCredentialSource>,
		/// Scripted authorization check.
		pub check: Arc<ScriptedCheck>,
		/// Recording realtime transport.
		pub transport: Arc<RecordingTransport>,
		/// Gateway pointing at an unused local address.
		pub gateway: Arc<RequestGateway>,
	}

	/// Builds a [`Harness`] around `source` and `check`.
	pub fn harness(source: ScriptedCredentialSource, check: ScriptedCheck) -> Harness {
		let config = test_config("http://127.0.0.1:9/api/");
		let source = Arc::new(source);
		let check = Arc::new(check);
		let transport = Arc::new(RecordingTransport::default());
		let gateway = Arc::new(
			RequestGateway::from_config(&config).expect("Fixture gateway should build."),
		);
		let authorization = Arc::new(AuthorizationCache::new(check.clone()));
		let realtime = Arc::new(RealtimeHandle::new(transport.clone()));
		let coordinator =
			SessionCoordinator::new(&config, source.clone(), gateway.clone(), authorization, realtime);

		Harness { coordinator, source, check, transport, gateway }
	}
}

mod _prelude {
	pub use std::{
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
