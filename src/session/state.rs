//! Session lifecycle states published to UI consumers.

// self
use crate::{_prelude::*, auth::UserId};

/// Message shown to the user when the credential could not be obtained.
pub const CREDENTIAL_FAILURE_MESSAGE: &str = "Authentication error. Please try again later.";

/// Coarse state label, convenient for matching and metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
	/// No user is signed in.
	Unauthenticated,
	/// Credential and authorization check in flight.
	Initializing,
	/// Credential installed and authorization check succeeded.
	Authenticated,
	/// Credential installed but the authorization check failed.
	Degraded,
	/// The credential could not be obtained.
	Error,
}
impl SessionStatus {
	/// Returns a stable label.
	pub const fn as_str(self) -> &'static str {
		match self {
			SessionStatus::Unauthenticated => "unauthenticated",
			SessionStatus::Initializing => "initializing",
			SessionStatus::Authenticated => "authenticated",
			SessionStatus::Degraded => "degraded",
			SessionStatus::Error => "error",
		}
	}
}
impl Display for SessionStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Coordinator state machine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionState {
	/// No user is signed in.
	#[default]
	Unauthenticated,
	/// The sign-in sequence is running.
	Initializing {
		/// Identity being signed in.
		identity: Option<UserId>,
	},
	/// Session is fully usable, realtime features included.
	Authenticated {
		/// Signed-in identity.
		identity: Option<UserId>,
		/// Privilege flag reported by the authorization check.
		privileged: bool,
	},
	/// Session is usable without privileges or realtime features.
	Degraded {
		/// Signed-in identity.
		identity: Option<UserId>,
		/// Authorization-check failure, for logs and diagnostics.
		reason: String,
	},
	/// Credential fetch failed; the user needs to retry.
	Error {
		/// Identity whose sign-in failed.
		identity: Option<UserId>,
		/// User-facing message.
		message: String,
		/// Underlying failure, for logs and diagnostics.
		cause: String,
	},
}
impl SessionState {
	/// Coarse label of the state.
	pub fn status(&self) -> SessionStatus {
		match self {
			Self::Unauthenticated => SessionStatus::Unauthenticated,
			Self::Initializing { .. } => SessionStatus::Initializing,
			Self::Authenticated { .. } => SessionStatus::Authenticated,
			Self::Degraded { .. } => SessionStatus::Degraded,
			Self::Error { .. } => SessionStatus::Error,
		}
	}

	/// Identity bound to the state, if any.
	pub fn identity(&self) -> Option<&UserId> {
		match self {
			Self::Unauthenticated => None,
			Self::Initializing { identity }
			| Self::Authenticated { identity, .. }
			| Self::Degraded { identity, .. }
			| Self::Error { identity, .. } => identity.as_ref(),
		}
	}

	/// Whether the state belongs to a signed-in session.
	pub fn is_signed_in(&self) -> bool {
		!matches!(self, Self::Unauthenticated)
	}

	/// User-facing error message, present only in [`SessionState::Error`].
	pub fn user_message(&self) -> Option<&str> {
		match self {
			Self::Error { message, .. } => Some(message),
			_ => None,
		}
	}
}
