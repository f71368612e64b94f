//! Credential checks at login.
//!
//! The server calls an [`Authenticator`] once per login attempt, with the
//! username and password from the `LOGIN` frame. [`StoredAccounts`] is the
//! built-in implementation: the first login for a name creates the
//! account in the match store, later logins must repeat the same password.

use sha2::{Digest, Sha256};
use tricard_protocol::Username;
use tricard_store::{Credentials, Recorder};

use crate::SessionError;

/// Validates a player's credentials.
///
/// `Send + Sync + 'static` because one authenticator is shared by every
/// connection task for the lifetime of the server.
///
/// # Example
///
/// ```rust
/// use tricard_protocol::Username;
/// use tricard_session::{Authenticator, SessionError};
///
/// /// Lets everyone in. Development only.
/// struct OpenDoor;
///
/// impl Authenticator for OpenDoor {
///     async fn authenticate(
///         &self,
///         _username: &Username,
///         _password: &str,
///     ) -> Result<(), SessionError> {
///         Ok(())
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Returns `Ok(())` if `password` is valid for `username`.
    fn authenticate(
        &self,
        username: &Username,
        password: &str,
    ) -> impl std::future::Future<Output = Result<(), SessionError>> + Send;
}

/// Hex SHA-256 of `<username>:<password>`, the form passwords are stored
/// in. The username salts the digest, so equal passwords differ per
/// account.
pub fn password_hash(username: &Username, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Accounts kept in the match store.
///
/// Accounts register on first login and survive restarts with any
/// persistent store. Logins are refused while the store is unavailable.
#[derive(Debug, Clone)]
pub struct StoredAccounts {
    recorder: Recorder,
}

impl StoredAccounts {
    pub fn new(recorder: Recorder) -> Self {
        Self { recorder }
    }
}

impl Authenticator for StoredAccounts {
    async fn authenticate(&self, username: &Username, password: &str) -> Result<(), SessionError> {
        if password.is_empty() {
            return Err(SessionError::AuthFailed("empty password".into()));
        }
        let hash = password_hash(username, password);
        match self.recorder.verify_login(username, &hash).await {
            Some(Credentials::Verified(_)) => Ok(()),
            Some(Credentials::Created(_)) => {
                tracing::info!(player = %username, "account created");
                Ok(())
            }
            Some(Credentials::Mismatch) => Err(SessionError::AuthFailed(format!(
                "wrong password for {username}"
            ))),
            None => Err(SessionError::AuthFailed("account store unavailable".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use tricard_store::{MatchStore, MemoryStore};

    use super::*;

    fn user(name: &str) -> Username {
        Username::parse(name).unwrap()
    }

    #[test]
    fn test_password_hash_is_salted_by_username() {
        let alice = password_hash(&user("alice"), "pw");
        assert_eq!(alice.len(), 64);
        assert_eq!(alice, password_hash(&user("alice"), "pw"));
        assert_ne!(alice, password_hash(&user("bob"), "pw"));
        assert_ne!(alice, password_hash(&user("alice"), "pw2"));
    }

    #[tokio::test]
    async fn test_stored_accounts_register_on_first_login() {
        let store = MemoryStore::new();
        let accounts = StoredAccounts::new(Recorder::spawn(store.clone()));
        accounts.authenticate(&user("alice"), "pw").await.unwrap();
        accounts.authenticate(&user("alice"), "pw").await.unwrap();

        let players = store.players();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].password_hash, password_hash(&user("alice"), "pw"));
    }

    #[tokio::test]
    async fn test_stored_accounts_reject_wrong_password() {
        let accounts = StoredAccounts::new(Recorder::spawn(MemoryStore::new()));
        accounts.authenticate(&user("alice"), "pw").await.unwrap();
        let err = accounts.authenticate(&user("alice"), "nope").await.unwrap_err();
        assert!(matches!(err, SessionError::AuthFailed(_)));
    }

    #[tokio::test]
    async fn test_stored_accounts_check_existing_rows() {
        let mut store = MemoryStore::new();
        let hash = password_hash(&user("carol"), "secret");
        store.verify_or_create(&user("carol"), &hash).unwrap();

        let accounts = StoredAccounts::new(Recorder::spawn(store));
        assert!(accounts.authenticate(&user("carol"), "guess").await.is_err());
        accounts.authenticate(&user("carol"), "secret").await.unwrap();
    }

    #[tokio::test]
    async fn test_stored_accounts_reject_empty_password_and_missing_store() {
        let store = MemoryStore::new();
        let accounts = StoredAccounts::new(Recorder::spawn(store.clone()));
        assert!(accounts.authenticate(&user("bob"), "").await.is_err());
        assert!(store.players().is_empty());

        let offline = StoredAccounts::new(Recorder::disabled());
        assert!(offline.authenticate(&user("bob"), "pw").await.is_err());
    }
}
