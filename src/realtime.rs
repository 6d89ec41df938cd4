//! Realtime connection handle enforcing at most one live connection.
//!
//! The wire protocol belongs to a [`RealtimeTransport`] implementation. [`RealtimeHandle`]
//! serializes every connect/disconnect through one async lock and applies close-then-open
//! discipline, so the transport never sees two overlapping connections.

// self
use crate::{
	_prelude::*,
	auth::UserId,
	error::ConnectionError,
	obs::{self, Phase, PhaseOutcome},
};

/// Boxed future returned by [`RealtimeTransport`] operations.
pub type RealtimeFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ConnectionError>> + 'a + Send>>;

/// Bidirectional connection backend scoped to one user identity at a time.
pub trait RealtimeTransport
where
	Self: Send + Sync,
{
	/// Opens a connection for `identity`.
	fn connect<'a>(&'a self, identity: &'a UserId) -> RealtimeFuture<'a>;

	/// Closes the open connection.
	fn disconnect(&self) -> RealtimeFuture<'_>;
}

/// Result of a guarded handle operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandleOutcome {
	/// The transport was called and the handle state changed.
	Applied,
	/// The handle already matched the requested state.
	Unchanged,
	/// The caller's guard rejected the operation.
	Skipped,
}

/// Owner of the single realtime connection.
pub struct RealtimeHandle {
	transport: Arc<dyn RealtimeTransport>,
	current: AsyncMutex<Option<UserId>>,
}
impl RealtimeHandle {
	/// Wraps `transport`; the handle starts disconnected.
	pub fn new(transport: Arc<dyn RealtimeTransport>) -> Self {
		Self { transport, current: AsyncMutex::new(None) }
	}

	/// Identity of the live connection, if any.
	pub async fn connected_identity(&self) -> Option<UserId> {
		self.current.lock().await.clone()
	}

	/// Opens a connection for `identity`, closing a connection held by another identity first.
	pub async fn connect(&self, identity: &UserId) -> Result<HandleOutcome, ConnectionError> {
		self.connect_if(identity, || true).await
	}

	/// Closes the live connection, if any.
	pub async fn disconnect(&self) -> Result<HandleOutcome, ConnectionError> {
		self.disconnect_if(|| true).await
	}

	/// Like [`connect`](Self::connect), but only when `still_current` holds once the handle lock
	/// is acquired.
	pub async fn connect_if<F>(
		&self,
		identity: &UserId,
		still_current: F,
	) -> Result<HandleOutcome, ConnectionError>
	where
		F: FnOnce() -> bool,
	{
		let mut current = self.current.lock().await;

		if !still_current() {
			return Ok(HandleOutcome::Skipped);
		}
		if current.as_ref() == Some(identity) {
			return Ok(HandleOutcome::Unchanged);
		}
		if let Some(previous) = current.take() {
			let closed = self.transport.disconnect().await;

			if let Err(err) = closed {
				obs::warn(Phase::Realtime, "close_before_open", &format_args!("{previous}: {err}"));
			}
		}

		obs::record_phase_outcome(Phase::Realtime, PhaseOutcome::Attempt);

		match self.transport.connect(identity).await {
			Ok(()) => {
				*current = Some(identity.clone());
				obs::record_phase_outcome(Phase::Realtime, PhaseOutcome::Success);

				Ok(HandleOutcome::Applied)
			},
			Err(err) => {
				obs::record_phase_outcome(Phase::Realtime, PhaseOutcome::Failure);

				Err(err)
			},
		}
	}

	/// Like [`disconnect`](Self::disconnect), but only when `still_current` holds once the
	/// handle lock is acquired.
	///
	/// The handle forgets the connection even when the transport reports a close failure.
	pub async fn disconnect_if<F>(&self, still_current: F) -> Result<HandleOutcome, ConnectionError>
	where
		F: FnOnce() -> bool,
	{
		let mut current = self.current.lock().await;

		if !still_current() {
			return Ok(HandleOutcome::Skipped);
		}
		if current.take().is_none() {
			return Ok(HandleOutcome::Unchanged);
		}

		self.transport.disconnect().await.map(|()| HandleOutcome::Applied)
	}
}
impl Debug for RealtimeHandle {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("RealtimeHandle(..)")
	}
}
