//! Coordinator-level error types shared across the gateway, cache, realtime handle, and session
//! state machine.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Startup configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Credential source failed to produce a credential.
	#[error(transparent)]
	Credential(#[from] CredentialError),
	/// Authorization check failed; recoverable.
	#[error(transparent)]
	Authorization(#[from] AuthorizationError),
	/// Realtime connection failure reported by the transport.
	#[error(transparent)]
	Connection(#[from] ConnectionError),
	/// Transport failure (DNS, TCP, TLS, URL joining).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Identifier failed validation.
	#[error(transparent)]
	Identifier(#[from] crate::auth::IdentifierError),
}

/// Startup configuration and validation failures.
///
/// Any of these is fatal before a coordinator can be constructed.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Identity-provider publishable key was not supplied.
	#[error("Missing publishable key; set `{var}`.")]
	MissingPublishableKey {
		/// Environment variable consulted.
		var: &'static str,
	},
	/// Publishable key is empty or contains whitespace.
	#[error("Publishable key is malformed.")]
	InvalidPublishableKey,
	/// API base URL cannot be parsed.
	#[error("API base URL is invalid.")]
	InvalidApiBase {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// API base URL must use HTTP(S) and be able to act as a base.
	#[error("API base URL must be an http(s) base URL: {url}.")]
	UnsupportedApiBase {
		/// Offending URL.
		url: String,
	},
	/// Renewal period must be strictly positive.
	#[error("Renewal period must be positive.")]
	NonPositiveRenewalPeriod,
	/// A numeric setting could not be parsed.
	#[error("Setting `{var}` is not a valid number: {value}.")]
	InvalidNumber {
		/// Environment variable consulted.
		var: &'static str,
		/// Raw value.
		value: String,
	},
	/// Unknown unauthorized-response policy label.
	#[error("Unknown unauthorized policy `{value}`.")]
	UnknownUnauthorizedPolicy {
		/// Raw value.
		value: String,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures raised by a [`CredentialSource`](crate::auth::CredentialSource).
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CredentialError {
	/// The identity provider rejected or failed the token request.
	#[error("Credential source failed: {message}.")]
	Source {
		/// Human-readable error payload.
		message: String,
	},
	/// The source resolved without a credential while reporting a signed-in session.
	#[error("Credential source returned no credential.")]
	Missing,
}
impl CredentialError {
	/// Builds a [`CredentialError::Source`] from any displayable message.
	pub fn source(message: impl Into<String>) -> Self {
		Self::Source { message: message.into() }
	}
}

/// Failures raised by the authorization check.
#[derive(Debug, ThisError)]
pub enum AuthorizationError {
	/// The check request never produced a response.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The backend answered with a non-success status.
	#[error("Authorization check returned HTTP {status}: {message}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Backend-supplied or fallback message.
		message: String,
	},
	/// The response body could not be decoded.
	#[error("Authorization check returned a malformed body.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl AuthorizationError {
	/// Message recorded in [`AuthorizationStatus::last_error`](crate::authz::AuthorizationStatus).
	pub fn status_message(&self) -> String {
		match self {
			Self::Status { message, .. } => message.clone(),
			other => other.to_string(),
		}
	}
}

/// Failures reported by a [`RealtimeTransport`](crate::realtime::RealtimeTransport).
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ConnectionError {
	/// Opening the connection failed.
	#[error("Realtime connect failed: {message}.")]
	Connect {
		/// Human-readable error payload.
		message: String,
	},
	/// Closing the connection failed.
	#[error("Realtime disconnect failed: {message}.")]
	Disconnect {
		/// Human-readable error payload.
		message: String,
	},
}

/// Transport-level failures (network, IO, request construction).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request path could not be joined onto the API base.
	#[error("Request path `{path}` is invalid.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
