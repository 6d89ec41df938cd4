//! Redacted secret wrappers for bearer credentials and the identity-provider key.

// self
use crate::_prelude::*;

/// Short-lived bearer credential; redacted in every formatter.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential(String);
impl Credential {
	/// Wraps a new credential string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Formats the value for an `Authorization` header.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.0)
	}
}
impl AsRef<str> for Credential {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Credential").field(&"<redacted>").finish()
	}
}
impl Display for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Identity-provider publishable key required at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct PublishableKey(String);
impl PublishableKey {
	/// Validates and wraps a publishable key.
	pub fn new(value: impl Into<String>) -> Result<Self, crate::error::ConfigError> {
		let value = value.into();

		if value.is_empty() || value.chars().any(char::is_whitespace) {
			return Err(crate::error::ConfigError::InvalidPublishableKey);
		}

		Ok(Self(value))
	}

	/// Returns the raw key.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for PublishableKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("PublishableKey").field(&"<redacted>").finish()
	}
}
