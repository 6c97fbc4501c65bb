//! # Session registry
//!
//! Process-local, in-memory mapping between opaque bearer tokens and user ids.
//!
//! The registry keeps a two-way map (`token -> user` and `user -> token`) behind a
//! single [`parking_lot::RwLock`]. [`SessionRegistry::validate`] only takes the read
//! guard, so concurrent requests validate in parallel; [`SessionRegistry::register`]
//! and [`SessionRegistry::invalidate`] take the write guard and update both
//! directions before releasing it, so no reader ever observes half of a mutation.
//!
//! ## Policy
//! - One live session per user. Registering a user who is already logged in ends
//!   their previous session inside the same critical section.
//! - Sessions never expire; they live until invalidated or until the process exits.
//! - Tokens are 32 bytes from a CSPRNG rendered as URL-safe base64 (no padding),
//!   and are never reused.
//!
//! ## Quick start
//! ```rust
//! use newsroom::session::{SessionKey, SessionRegistry};
//!
//! let registry = SessionRegistry::new();
//! let session = registry.register(7).unwrap();
//! assert_eq!(registry.validate(&session.token), Some(7));
//!
//! assert!(registry.invalidate(SessionKey::Token(&session.token)));
//! assert_eq!(registry.validate(&session.token), None);
//! ```

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use parking_lot::RwLock;
use rand::RngCore;
use std::collections::HashMap;
use tracing::debug;

use crate::UserId;
use crate::error::SessionError;

/// Bytes of entropy per token.
pub const TOKEN_BYTES: usize = 32;

/// A live session handed back to the client after login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque bearer credential.
    pub token: String,
    /// The user the token authenticates.
    pub user_id: UserId,
}

/// Identifies a session to end: by its user or by its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKey<'a> {
    User(UserId),
    Token(&'a str),
}

impl<'a> SessionKey<'a> {
    /// Build a key from two optional fields, as received from a logout request.
    ///
    /// Exactly one of `user_id` and `token` must be present; otherwise this returns
    /// [`SessionError::AmbiguousKey`], which callers can tell apart from the plain
    /// `false` that [`SessionRegistry::invalidate`] returns for an unknown key.
    pub fn from_parts(
        user_id: Option<UserId>,
        token: Option<&'a str>,
    ) -> Result<Self, SessionError> {
        match (user_id, token) {
            (Some(user_id), None) => Ok(SessionKey::User(user_id)),
            (None, Some(token)) => Ok(SessionKey::Token(token)),
            _ => Err(SessionError::AmbiguousKey),
        }
    }
}

/// Two-way token/user map. Only mutated under the registry's write lock.
#[derive(Debug, Default)]
struct TokenMap {
    token_to_user: HashMap<String, UserId>,
    user_to_token: HashMap<UserId, String>,
}

impl TokenMap {
    fn user_id(&self, token: &str) -> Option<UserId> {
        self.token_to_user.get(token).copied()
    }

    fn contains_token(&self, token: &str) -> bool {
        self.token_to_user.contains_key(token)
    }

    /// Install `token` for `user_id`, returning the token it displaced, if any.
    fn insert(&mut self, user_id: UserId, token: String) -> Option<String> {
        let displaced = self.remove_user(user_id);
        self.token_to_user.insert(token.clone(), user_id);
        self.user_to_token.insert(user_id, token);
        displaced
    }

    fn remove_user(&mut self, user_id: UserId) -> Option<String> {
        let token = self.user_to_token.remove(&user_id)?;
        self.token_to_user.remove(&token);
        Some(token)
    }

    fn remove_token(&mut self, token: &str) -> Option<UserId> {
        let user_id = self.token_to_user.remove(token)?;
        self.user_to_token.remove(&user_id);
        Some(user_id)
    }

    fn len(&self) -> usize {
        debug_assert_eq!(self.token_to_user.len(), self.user_to_token.len());
        self.token_to_user.len()
    }
}

/// Shared registry of live sessions.
///
/// Create one per process and hand references (or an `Arc`) to request handlers.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<TokenMap>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session for `user_id` and return its fresh token.
    ///
    /// Any session the user already holds is invalidated first.
    ///
    /// # Errors
    /// [`SessionError::InvalidUserId`] if `user_id` is negative.
    pub fn register(&self, user_id: UserId) -> Result<Session, SessionError> {
        if user_id < 0 {
            return Err(SessionError::InvalidUserId(user_id));
        }

        let mut sessions = self.sessions.write();
        let mut token = generate_token();
        while sessions.contains_token(&token) {
            token = generate_token();
        }

        if sessions.insert(user_id, token.clone()).is_some() {
            debug!(user_id, "replaced existing session");
        } else {
            debug!(user_id, "registered session");
        }

        Ok(Session { token, user_id })
    }

    /// Resolve a token to its user. `None` when the token is unknown or was invalidated.
    pub fn validate(&self, token: &str) -> Option<UserId> {
        self.sessions.read().user_id(token)
    }

    /// End the session identified by `key`. Returns `false` if it was not live.
    pub fn invalidate(&self, key: SessionKey<'_>) -> bool {
        let mut sessions = self.sessions.write();
        let removed = match key {
            SessionKey::User(user_id) => sessions.remove_user(user_id).map(|_| user_id),
            SessionKey::Token(token) => sessions.remove_token(token),
        };
        match removed {
            Some(user_id) => {
                debug!(user_id, "invalidated session");
                true
            }
            None => false,
        }
    }

    pub fn invalidate_by_user(&self, user_id: UserId) -> bool {
        self.invalidate(SessionKey::User(user_id))
    }

    pub fn invalidate_by_token(&self, token: &str) -> bool {
        self.invalidate(SessionKey::Token(token))
    }

    /// The live token of `user_id`, if logged in.
    pub fn token_for(&self, user_id: UserId) -> Option<String> {
        self.sessions.read().user_to_token.get(&user_id).cloned()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 32 random bytes from the thread-local CSPRNG, URL-safe base64 encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_register_then_validate() {
        let registry = SessionRegistry::new();
        for user_id in [0, 1, 42, i64::MAX] {
            let session = registry.register(user_id).unwrap();
            assert!(!session.token.is_empty());
            assert_eq!(session.user_id, user_id);
            assert_eq!(registry.validate(&session.token), Some(user_id));
        }
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_register_negative_user_fails() {
        let registry = SessionRegistry::new();
        assert_eq!(
            registry.register(-1),
            Err(SessionError::InvalidUserId(-1))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        // 32 bytes -> 43 base64 characters without padding
        assert_eq!(token.len(), 43);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_invalidate_by_token() {
        let registry = SessionRegistry::new();
        let session = registry.register(3).unwrap();

        assert!(registry.invalidate_by_token(&session.token));
        assert_eq!(registry.validate(&session.token), None);
        assert_eq!(registry.token_for(3), None);
        assert!(!registry.invalidate_by_token(&session.token));
    }

    #[test]
    fn test_invalidate_by_user() {
        let registry = SessionRegistry::new();
        let session = registry.register(9).unwrap();

        assert!(registry.invalidate(SessionKey::User(9)));
        assert_eq!(registry.validate(&session.token), None);
        assert!(!registry.invalidate_by_user(9));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_invalidate_unknown_is_false() {
        let registry = SessionRegistry::new();
        registry.register(1).unwrap();
        assert!(!registry.invalidate_by_token("not-a-token"));
        assert!(!registry.invalidate_by_user(2));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_session_key_requires_exactly_one_part() {
        assert_eq!(
            SessionKey::from_parts(None, None),
            Err(SessionError::AmbiguousKey)
        );
        assert_eq!(
            SessionKey::from_parts(Some(1), Some("abc")),
            Err(SessionError::AmbiguousKey)
        );
        assert_eq!(SessionKey::from_parts(Some(1), None), Ok(SessionKey::User(1)));
        assert_eq!(
            SessionKey::from_parts(None, Some("abc")),
            Ok(SessionKey::Token("abc"))
        );
    }

    #[test]
    fn test_second_login_replaces_first_session() {
        let registry = SessionRegistry::new();
        let first = registry.register(5).unwrap();
        let second = registry.register(5).unwrap();

        assert_ne!(first.token, second.token);
        assert_eq!(registry.validate(&first.token), None);
        assert_eq!(registry.validate(&second.token), Some(5));
        assert_eq!(registry.token_for(5), Some(second.token));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_tokens_are_unique() {
        let registry = SessionRegistry::new();
        let tokens: HashSet<String> = (0..10_000)
            .map(|user_id| registry.register(user_id).unwrap().token)
            .collect();
        assert_eq!(tokens.len(), 10_000);
        assert_eq!(registry.len(), 10_000);
    }

    #[test]
    fn test_tokens_are_not_reused_after_invalidation() {
        let registry = SessionRegistry::new();
        let mut seen = HashSet::new();
        for _ in 0..1_000 {
            let session = registry.register(1).unwrap();
            assert!(seen.insert(session.token.clone()));
            registry.invalidate_by_token(&session.token);
        }
    }

    #[test]
    fn test_concurrent_validate_matches_sequential() {
        let registry = SessionRegistry::new();
        let sessions: Vec<Session> = (0..256).map(|u| registry.register(u).unwrap()).collect();
        let mut probes: Vec<String> = sessions.iter().map(|s| s.token.clone()).collect();
        probes.push("missing".to_string());

        let sequential: Vec<Option<UserId>> =
            probes.iter().map(|t| registry.validate(t)).collect();
        let concurrent: Vec<Option<UserId>> = (0..64)
            .into_par_iter()
            .flat_map_iter(|_| probes.iter().map(|t| registry.validate(t)))
            .collect();

        for chunk in concurrent.chunks(probes.len()) {
            assert_eq!(chunk, sequential.as_slice());
        }
    }

    #[test]
    fn test_concurrent_mutation_is_never_half_applied() {
        let registry = Arc::new(SessionRegistry::new());

        rayon::scope(|scope| {
            for worker in 0..8i64 {
                let registry = Arc::clone(&registry);
                scope.spawn(move |_| {
                    for round in 0..500 {
                        let user_id = worker * 1_000 + (round % 10);
                        let session = registry.register(user_id).unwrap();
                        // Another worker never touches this user, so the token is
                        // either ours and live, or already replaced by us.
                        assert_eq!(registry.validate(&session.token), Some(user_id));
                        if round % 3 == 0 {
                            assert!(registry.invalidate_by_token(&session.token));
                            assert_eq!(registry.validate(&session.token), None);
                            assert_eq!(registry.token_for(user_id), None);
                        }
                    }
                });
            }
            for _ in 0..4 {
                let registry = Arc::clone(&registry);
                scope.spawn(move |_| {
                    for worker in 0..8i64 {
                        for slot in 0..10 {
                            let user_id = worker * 1_000 + slot;
                            if let Some(token) = registry.token_for(user_id) {
                                let seen = registry.validate(&token);
                                assert!(seen.is_none() || seen == Some(user_id));
                            }
                        }
                    }
                });
            }
        });

        let sessions = registry.sessions.read();
        for (token, user_id) in &sessions.token_to_user {
            assert_eq!(sessions.user_to_token.get(user_id), Some(token));
        }
        assert_eq!(sessions.token_to_user.len(), sessions.user_to_token.len());
    }
}
