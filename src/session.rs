//! Session lifecycle coordinator.
//!
//! [`SessionCoordinator`] reacts to sign-in/sign-out snapshots from a
//! [`CredentialSource`](crate::auth::CredentialSource). A sign-in fetches a fresh credential,
//! installs it into the [`RequestGateway`], refreshes the [`AuthorizationCache`], and on success
//! opens the realtime connection for the signed-in identity. A sign-out closes the realtime
//! connection, cancels credential renewal, clears the gateway credential, and resets the cache.
//!
//! Each transition is split into a synchronous prologue, which advances the
//! [`GenerationClock`] and publishes the entry state, and an asynchronous body. Every effect the
//! body applies after a suspension point is fenced by the generation captured in the prologue,
//! so a transition that was superseded while waiting on the network discards its results
//! instead of installing stale credentials or connections. Transition bodies never return
//! errors; each reaches exactly one terminal state.

pub mod generation;
pub mod renewal;
pub mod state;

pub use generation::*;
pub use renewal::{RenewalMetrics, RenewalTask};
pub use state::*;

// crates.io
use tokio::{sync::watch, task::JoinSet};
// self
use crate::{
	_prelude::*,
	auth::{CredentialSource, Session, UserId},
	authz::AuthorizationCache,
	config::CoordinatorConfig,
	error::CredentialError,
	http::RequestGateway,
	obs::{self, Phase, PhaseOutcome, PhaseSpan},
	realtime::{HandleOutcome, RealtimeHandle, RealtimeTransport},
	session::renewal::RenewalContext,
};

#[derive(Debug)]
enum Transition {
	SignIn { identity: Option<UserId>, generation: Generation },
	SignOut { generation: Generation },
}

/// Coordinates credential, authorization, and realtime lifecycles for one client process.
///
/// The coordinator is cheap to clone; clones share all state. Collaborators are injected so
/// several coordinators can coexist, e.g. in tests.
#[derive(Clone)]
pub struct SessionCoordinator {
	source: Arc<dyn CredentialSource>,
	gateway: Arc<RequestGateway>,
	authorization: Arc<AuthorizationCache>,
	realtime: Arc<RealtimeHandle>,
	clock: Arc<GenerationClock>,
	state: Arc<watch::Sender<SessionState>>,
	// Doubles as the transition lock; always taken before the clock.
	renewal: Arc<Mutex<Option<RenewalTask>>>,
	renewal_period: std::time::Duration,
	renewal_metrics: Arc<RenewalMetrics>,
}
impl SessionCoordinator {
	/// Creates an idle coordinator in [`SessionState::Unauthenticated`].
	///
	/// Call [`start`](Self::start) or [`run`](Self::run) to evaluate the current sign-in status.
	pub fn new(
		config: &CoordinatorConfig,
		source: Arc<dyn CredentialSource>,
		gateway: Arc<RequestGateway>,
		authorization: Arc<AuthorizationCache>,
		realtime: Arc<RealtimeHandle>,
	) -> Self {
		Self {
			source,
			gateway,
			authorization,
			realtime,
			clock: Default::default(),
			state: Arc::new(watch::Sender::new(SessionState::Unauthenticated)),
			renewal: Default::default(),
			renewal_period: config.renewal_interval(),
			renewal_metrics: Default::default(),
		}
	}

	/// Wires a gateway, authorization cache, and realtime handle from `config`, then starts.
	pub async fn bootstrap(
		config: CoordinatorConfig,
		source: Arc<dyn CredentialSource>,
		transport: Arc<dyn RealtimeTransport>,
	) -> Result<Self> {
		let gateway = Arc::new(RequestGateway::from_config(&config)?);

		Ok(Self::bootstrap_with_gateway(&config, source, gateway, transport).await)
	}

	/// Like [`bootstrap`](Self::bootstrap), but reuses a prepared gateway, e.g. one built on a
	/// custom reqwest client. The gateway's own base URL and policy take precedence over
	/// `config`.
	pub async fn bootstrap_with_gateway(
		config: &CoordinatorConfig,
		source: Arc<dyn CredentialSource>,
		gateway: Arc<RequestGateway>,
		transport: Arc<dyn RealtimeTransport>,
	) -> Self {
		let authorization = Arc::new(AuthorizationCache::new(gateway.clone()));
		let realtime = Arc::new(RealtimeHandle::new(transport));
		let coordinator = Self::new(config, source, gateway, authorization, realtime);

		coordinator.start().await;

		coordinator
	}

	/// Evaluates the source's current sign-in status; already signed in means sign-in now.
	pub async fn start(&self) {
		let session = self.source.session();

		self.handle_session(session).await;
	}

	/// Drives the coordinator from a sign-in subscription until the feed closes.
	///
	/// The feed's current value is evaluated first. Transition bodies run as separate tasks so
	/// a sign-out is processed while an earlier sign-in is still waiting on the network. When
	/// the feed closes the coordinator shuts down.
	pub async fn run(&self, mut feed: watch::Receiver<Session>) {
		let mut in_flight = JoinSet::new();
		let initial = feed.borrow_and_update().clone();

		self.dispatch(initial, &mut in_flight);

		while feed.changed().await.is_ok() {
			while in_flight.try_join_next().is_some() {}

			let session = feed.borrow_and_update().clone();

			self.dispatch(session, &mut in_flight);
		}

		self.shutdown().await;

		while in_flight.join_next().await.is_some() {}
	}

	/// Applies one sign-in snapshot and waits for the resulting transition to settle.
	pub async fn handle_session(&self, session: Session) {
		if let Some(transition) = self.begin(session) {
			self.drive(transition).await;
		}
	}

	/// Re-runs the sign-in sequence after a credential failure.
	///
	/// Returns `false` without doing anything unless the coordinator is in
	/// [`SessionState::Error`].
	pub async fn retry(&self) -> bool {
		let identity = match &*self.state.borrow() {
			SessionState::Error { identity, .. } => identity.clone(),
			_ => return false,
		};

		self.handle_session(Session::new(true, identity)).await;

		true
	}

	/// Tears everything down exactly like a sign-out.
	pub async fn shutdown(&self) {
		self.handle_session(Session::signed_out()).await;
	}

	/// Current state snapshot.
	pub fn state(&self) -> SessionState {
		self.state.borrow().clone()
	}

	/// Subscribes to state changes.
	pub fn subscribe(&self) -> watch::Receiver<SessionState> {
		self.state.subscribe()
	}

	/// Whether a renewal task is currently scheduled.
	pub fn renewal_active(&self) -> bool {
		self.renewal.lock().as_ref().is_some_and(RenewalTask::is_running)
	}

	/// Counters shared by every renewal task this coordinator spawns.
	pub fn renewal_metrics(&self) -> &RenewalMetrics {
		&self.renewal_metrics
	}

	/// Injected request gateway.
	pub fn gateway(&self) -> &Arc<RequestGateway> {
		&self.gateway
	}

	/// Injected authorization cache.
	pub fn authorization(&self) -> &Arc<AuthorizationCache> {
		&self.authorization
	}

	/// Injected realtime handle.
	pub fn realtime(&self) -> &Arc<RealtimeHandle> {
		&self.realtime
	}

	fn dispatch(&self, session: Session, in_flight: &mut JoinSet<()>) {
		if let Some(transition) = self.begin(session) {
			let this = self.clone();

			in_flight.spawn(async move { this.drive(transition).await });
		}
	}

	fn begin(&self, session: Session) -> Option<Transition> {
		let mut renewal = self.renewal.lock();

		if !session.is_signed_in() {
			let (generation, ()) = self.clock.advance_with(|_| {
				self.state.send_replace(SessionState::Unauthenticated);
				self.gateway.install_credential(None);
				self.authorization.reset();
			});

			return Some(Transition::SignOut { generation });
		}

		let identity = session.identity().cloned();

		if self.already_signed_in(identity.as_ref()) {
			return None;
		}

		let (generation, ()) = self.clock.advance_with(|_| {
			self.state.send_replace(SessionState::Initializing { identity: identity.clone() });
			self.authorization.reset();
		});

		*renewal = Some(RenewalTask::spawn(self.renewal_context(), generation));

		Some(Transition::SignIn { identity, generation })
	}

	fn already_signed_in(&self, identity: Option<&UserId>) -> bool {
		let state = self.state.borrow();

		matches!(
			*state,
			SessionState::Initializing { .. }
				| SessionState::Authenticated { .. }
				| SessionState::Degraded { .. }
		) && state.identity() == identity
	}

	fn renewal_context(&self) -> RenewalContext {
		RenewalContext {
			source: self.source.clone(),
			gateway: self.gateway.clone(),
			clock: self.clock.clone(),
			period: self.renewal_period,
			metrics: self.renewal_metrics.clone(),
		}
	}

	async fn drive(&self, transition: Transition) {
		match transition {
			Transition::SignIn { identity, generation } => {
				let span = PhaseSpan::new(Phase::SignIn, "drive");

				span.instrument(self.sign_in(identity, generation)).await
			},
			Transition::SignOut { generation } => {
				let span = PhaseSpan::new(Phase::SignOut, "drive");

				span.instrument(self.sign_out(generation)).await
			},
		}
	}

	async fn sign_in(&self, identity: Option<UserId>, generation: Generation) {
		const PHASE: Phase = Phase::SignIn;

		obs::record_phase_outcome(PHASE, PhaseOutcome::Attempt);

		let credential = match self.source.get_token(true).await {
			Ok(Some(credential)) => credential,
			Ok(None) => return self.fail_credential(identity, generation, CredentialError::Missing).await,
			Err(err) => return self.fail_credential(identity, generation, err).await,
		};

		if self
			.clock
			.run_if_current(generation, || self.gateway.install_credential(Some(credential)))
			.is_none()
		{
			return superseded(PHASE);
		}

		match self.authorization.refresh().await {
			Ok(privileged) => {
				let next = SessionState::Authenticated { identity: identity.clone(), privileged };

				if self.clock.run_if_current(generation, || self.state.send_replace(next)).is_none() {
					return superseded(PHASE);
				}

				obs::record_phase_outcome(PHASE, PhaseOutcome::Success);
				self.open_realtime(identity.as_ref(), generation).await;
			},
			Err(err) => {
				let next = SessionState::Degraded { identity, reason: err.to_string() };
				let applied = self.clock.run_if_current(generation, || {
					self.authorization.reset();
					self.state.send_replace(next);
				});

				if applied.is_none() {
					return superseded(PHASE);
				}

				obs::warn(PHASE, "authorization_check", &err);
				obs::record_phase_outcome(PHASE, PhaseOutcome::Failure);
				self.close_realtime(generation).await;
			},
		}
	}

	async fn fail_credential(
		&self,
		identity: Option<UserId>,
		generation: Generation,
		err: CredentialError,
	) {
		const PHASE: Phase = Phase::SignIn;

		let next = SessionState::Error {
			identity,
			message: CREDENTIAL_FAILURE_MESSAGE.into(),
			cause: err.to_string(),
		};
		let applied = self.clock.run_if_current(generation, || {
			self.gateway.install_credential(None);
			self.state.send_replace(next);
		});

		if applied.is_none() {
			return superseded(PHASE);
		}

		obs::error(PHASE, "credential", &err);
		obs::record_phase_outcome(PHASE, PhaseOutcome::Failure);
		self.close_realtime(generation).await;
	}

	async fn sign_out(&self, generation: Generation) {
		const PHASE: Phase = Phase::SignOut;

		obs::record_phase_outcome(PHASE, PhaseOutcome::Attempt);
		self.close_realtime(generation).await;
		self.cancel_renewal(generation);
		obs::record_phase_outcome(PHASE, PhaseOutcome::Success);
	}

	async fn open_realtime(&self, identity: Option<&UserId>, generation: Generation) {
		let Some(identity) = identity else {
			obs::info(Phase::Realtime, "connect", &"No identity available; realtime connection skipped.");

			return;
		};

		match self.realtime.connect_if(identity, || self.clock.is_current(generation)).await {
			Ok(HandleOutcome::Skipped) => superseded(Phase::Realtime),
			Ok(_) => {},
			Err(err) => obs::warn(Phase::Realtime, "connect", &err),
		}
	}

	async fn close_realtime(&self, generation: Generation) {
		if let Err(err) = self.realtime.disconnect_if(|| self.clock.is_current(generation)).await {
			obs::warn(Phase::Realtime, "disconnect", &err);
		}
	}

	fn cancel_renewal(&self, generation: Generation) {
		let mut renewal = self.renewal.lock();

		if !self.clock.is_current(generation) {
			return;
		}
		if let Some(task) = renewal.take() {
			task.cancel();
		}
	}
}
impl Debug for SessionCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionCoordinator")
			.field("state", &*self.state.borrow())
			.field("gateway", &self.gateway)
			.field("renewal_period", &self.renewal_period)
			.finish()
	}
}

fn superseded(phase: Phase) {
	obs::record_phase_outcome(phase, PhaseOutcome::Superseded);
}
