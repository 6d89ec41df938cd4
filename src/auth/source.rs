//! Contract for the identity provider that owns sessions and mints bearer credentials.

// self
use crate::{
	_prelude::*,
	auth::{Credential, Session, UserId},
	error::CredentialError,
};

/// Boxed future returned by [`CredentialSource::get_token`].
pub type CredentialFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Option<Credential>, CredentialError>> + 'a + Send>>;

/// Identity provider consumed by the session coordinator.
///
/// Implementations own the session; the coordinator only observes it. Sign-in transitions are
/// delivered separately, typically through a [`SessionFeed`](crate::auth::SessionFeed) the
/// source embeds.
pub trait CredentialSource
where
	Self: Send + Sync,
{
	/// Whether a user is currently signed in.
	fn is_signed_in(&self) -> bool;

	/// Identity of the signed-in user, if any.
	fn current_identity(&self) -> Option<UserId>;

	/// Fetches a bearer credential, bypassing any provider-side cache when `force_fresh` is set.
	fn get_token(&self, force_fresh: bool) -> CredentialFuture<'_>;

	/// Snapshot combining [`is_signed_in`](Self::is_signed_in) and
	/// [`current_identity`](Self::current_identity).
	fn session(&self) -> Session {
		Session::new(self.is_signed_in(), self.current_identity())
	}
}
