//! Optional observability helpers for the session lifecycle.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (default) to emit structured spans named `session_lifecycle.phase` with the
//!   `phase` and `stage` fields, plus `info`/`warn` events for renewals and recoverable failures.
//! - Enable `metrics` to increment the `session_lifecycle_phase_total` counter for every
//!   attempt/success/failure, labeled by `phase` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Lifecycle phases observed by the coordinator and its collaborators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
	/// Sign-in sequence (credential, authorization check, realtime connect).
	SignIn,
	/// Sign-out teardown.
	SignOut,
	/// Periodic or signalled credential renewal.
	Renewal,
	/// Authorization status refresh.
	AuthorizationCheck,
	/// Realtime connection management.
	Realtime,
	/// Outbound request gateway.
	Gateway,
}
impl Phase {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Phase::SignIn => "sign_in",
			Phase::SignOut => "sign_out",
			Phase::Renewal => "renewal",
			Phase::AuthorizationCheck => "authorization_check",
			Phase::Realtime => "realtime",
			Phase::Gateway => "gateway",
		}
	}
}
impl Display for Phase {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseOutcome {
	/// Entry to a phase.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure; the coordinator decides severity.
	Failure,
	/// Result discarded because a newer transition superseded it.
	Superseded,
}
impl PhaseOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			PhaseOutcome::Attempt => "attempt",
			PhaseOutcome::Success => "success",
			PhaseOutcome::Failure => "failure",
			PhaseOutcome::Superseded => "superseded",
		}
	}
}
impl Display for PhaseOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
