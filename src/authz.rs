//! Authorization status cache refreshed by one explicit privilege check.
//!
//! [`AuthorizationCache::refresh`] propagates failures to its caller after recording them, so
//! the coordinator decides severity. Every [`AuthorizationCache::reset`] advances an internal
//! epoch; a refresh that was suspended across a reset commits nothing when it resumes.

// self
use crate::{
	_prelude::*,
	error::{AuthorizationError, TransportError},
	http::RequestGateway,
	obs::{self, Phase, PhaseOutcome, PhaseSpan},
};

const FALLBACK_MESSAGE: &str = "Failed to check admin status";

/// Boxed future returned by [`AuthorizationCheck::check`].
pub type AuthorizationFuture<'a> =
	Pin<Box<dyn Future<Output = Result<bool, AuthorizationError>> + 'a + Send>>;

/// Backend call answering whether the current session is privileged.
pub trait AuthorizationCheck
where
	Self: Send + Sync,
{
	/// Issues exactly one authorization-check request.
	fn check(&self) -> AuthorizationFuture<'_>;
}

/// Snapshot of the session's privilege state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationStatus {
	/// Whether the session holds administrative privileges.
	pub is_privileged: bool,
	/// Whether a check is in flight.
	pub is_checking: bool,
	/// Message of the last failed check, cleared when a new check starts.
	pub last_error: Option<String>,
	/// Instant of the last successful check.
	pub checked_at: Option<OffsetDateTime>,
}
impl AuthorizationStatus {
	/// Whether the status equals the reset value.
	pub fn is_reset(&self) -> bool {
		*self == Self::default()
	}
}

#[derive(Debug, Default)]
struct CacheSlot {
	epoch: u64,
	status: AuthorizationStatus,
}

/// Process-wide authorization status, injected into the coordinator.
pub struct AuthorizationCache {
	check: Arc<dyn AuthorizationCheck>,
	slot: Mutex<CacheSlot>,
}
impl AuthorizationCache {
	/// Creates a cache backed by `check`.
	pub fn new(check: Arc<dyn AuthorizationCheck>) -> Self {
		Self { check, slot: Default::default() }
	}

	/// Returns the current status snapshot.
	pub fn status(&self) -> AuthorizationStatus {
		self.slot.lock().status.clone()
	}

	/// Runs one authorization check and records its outcome.
	///
	/// Returns the privilege flag on success. On failure the status records the message and the
	/// error is returned unchanged.
	pub async fn refresh(&self) -> Result<bool, AuthorizationError> {
		const PHASE: Phase = Phase::AuthorizationCheck;

		let span = PhaseSpan::new(PHASE, "refresh");
		let epoch = {
			let mut slot = self.slot.lock();

			slot.status.is_checking = true;
			slot.status.last_error = None;

			slot.epoch
		};

		obs::record_phase_outcome(PHASE, PhaseOutcome::Attempt);

		let result = span.instrument(self.check.check()).await;
		let mut slot = self.slot.lock();

		if slot.epoch != epoch {
			drop(slot);
			obs::record_phase_outcome(PHASE, PhaseOutcome::Superseded);

			return result;
		}

		slot.status.is_checking = false;

		match &result {
			Ok(privileged) => {
				slot.status.is_privileged = *privileged;
				slot.status.checked_at = Some(OffsetDateTime::now_utc());
				drop(slot);
				obs::record_phase_outcome(PHASE, PhaseOutcome::Success);
			},
			Err(err) => {
				slot.status.is_privileged = false;
				slot.status.last_error = Some(err.status_message());
				drop(slot);
				obs::warn(PHASE, "refresh", err);
				obs::record_phase_outcome(PHASE, PhaseOutcome::Failure);
			},
		}

		result
	}

	/// Restores the reset status without any network call and invalidates in-flight refreshes.
	pub fn reset(&self) {
		let mut slot = self.slot.lock();

		slot.epoch = slot.epoch.wrapping_add(1);
		slot.status = AuthorizationStatus::default();
	}
}
impl Debug for AuthorizationCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationCache").field("status", &self.slot.lock().status).finish()
	}
}

#[derive(Deserialize)]
struct AdminCheckResponse {
	admin: bool,
}

#[derive(Deserialize)]
struct BackendMessage {
	message: String,
}

impl AuthorizationCheck for RequestGateway {
	fn check(&self) -> AuthorizationFuture<'_> {
		Box::pin(async move {
			let response = self.get(self.admin_check_path()).await?;
			let status = response.status();
			let body = response.bytes().await.map_err(TransportError::from)?;

			if !status.is_success() {
				return Err(AuthorizationError::Status {
					status: status.as_u16(),
					message: backend_message(&body),
				});
			}

			let mut deserializer = serde_json::Deserializer::from_slice(&body);
			let payload: AdminCheckResponse = serde_path_to_error::deserialize(&mut deserializer)
				.map_err(|source| AuthorizationError::Decode { source })?;

			Ok(payload.admin)
		})
	}
}

fn backend_message(body: &[u8]) -> String {
	serde_json::from_slice::<BackendMessage>(body)
		.map(|payload| payload.message)
		.ok()
		.filter(|message| !message.is_empty())
		.unwrap_or_else(|| FALLBACK_MESSAGE.into())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	struct Fixed(Mutex<Option<Result<bool, AuthorizationError>>>);
	impl AuthorizationCheck for Fixed {
		fn check(&self) -> AuthorizationFuture<'_> {
			let result = self.0.lock().take().unwrap_or(Ok(false));

			Box::pin(async move { result })
		}
	}

	fn cache(result: Result<bool, AuthorizationError>) -> AuthorizationCache {
		AuthorizationCache::new(Arc::new(Fixed(Mutex::new(Some(result)))))
	}

	#[tokio::test]
	async fn refresh_success_sets_privilege() {
		let cache = cache(Ok(true));

		assert!(cache.refresh().await.expect("Check should succeed."));

		let status = cache.status();

		assert!(status.is_privileged);
		assert!(!status.is_checking);
		assert!(status.last_error.is_none());
		assert!(status.checked_at.is_some());
	}

	#[tokio::test]
	async fn refresh_failure_records_message_and_propagates() {
		let cache = cache(Err(AuthorizationError::Status { status: 500, message: "boom".into() }));
		let err = cache.refresh().await.expect_err("Check failure should propagate.");

		assert!(matches!(err, AuthorizationError::Status { status: 500, .. }));

		let status = cache.status();

		assert!(!status.is_privileged);
		assert!(!status.is_checking);
		assert_eq!(status.last_error.as_deref(), Some("boom"));

		cache.reset();

		assert!(cache.status().is_reset());
	}

	#[test]
	fn backend_message_falls_back() {
		assert_eq!(
			backend_message(b"{\"message\":\"Unauthorized - you must be an admin\"}"),
			"Unauthorized - you must be an admin"
		);
		assert_eq!(backend_message(b"<html>"), FALLBACK_MESSAGE);
		assert_eq!(backend_message(b"{\"message\":\"\"}"), FALLBACK_MESSAGE);
	}
}
