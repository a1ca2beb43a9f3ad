use crate::domain::{SessionUser, UserRole};
use crate::error::DatamartError;
use crate::store::KeyValueStore;

pub const AUTH_FLAG_KEY: &str = "isAuthenticated";
pub const USER_KEY: &str = "user";

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// Startup, before persisted state has been read.
    Loading,
    Unauthenticated,
    Authenticated(SessionUser),
}

/// External authority deciding whether a credential pair is valid.
pub trait IdentityProvider: Send + Sync {
    fn authenticate(&self, username: &str, password: &str) -> Result<SessionUser, DatamartError>;
}

/// Placeholder provider recognizing exactly one credential pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticIdentityProvider;

impl IdentityProvider for StaticIdentityProvider {
    fn authenticate(&self, username: &str, password: &str) -> Result<SessionUser, DatamartError> {
        if username == "admin" && password == "admin" {
            Ok(SessionUser {
                username: "admin".to_string(),
                name: "Administrator".to_string(),
                email: "admin@datamarketplace.com".to_string(),
                role: UserRole::Admin,
            })
        } else {
            Err(DatamartError::InvalidCredentials)
        }
    }
}

/// Local session gate: rehydrates from the key-value store at startup and
/// enforces authentication on protected operations.
pub struct SessionGate<S: KeyValueStore, I: IdentityProvider> {
    store: S,
    identity: I,
    state: AuthState,
}

impl<S: KeyValueStore, I: IdentityProvider> SessionGate<S, I> {
    pub fn new(store: S, identity: I) -> Self {
        Self {
            store,
            identity,
            state: AuthState::Loading,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated(_))
    }

    pub fn current_user(&self) -> Option<&SessionUser> {
        match &self.state {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    /// Gate for protected operations: passes through the session user or
    /// refuses with a typed error the surface renders as a login prompt.
    pub fn require_authenticated(&self) -> Result<&SessionUser, DatamartError> {
        self.current_user().ok_or(DatamartError::NotAuthenticated)
    }

    /// Restores the session from persisted state. A corrupt user record is
    /// discarded (both keys removed) and the gate lands on Unauthenticated
    /// rather than propagating the parse failure.
    pub fn rehydrate(&mut self) -> Result<&AuthState, DatamartError> {
        let flag = self.store.get(AUTH_FLAG_KEY)?;
        let user_raw = self.store.get(USER_KEY)?;

        self.state = match (flag.as_deref(), user_raw) {
            (Some("true"), Some(raw)) => match serde_json::from_str::<SessionUser>(&raw) {
                Ok(user) => AuthState::Authenticated(user),
                Err(err) => {
                    tracing::warn!(error = %err, "discarding corrupt persisted session");
                    self.store.remove(AUTH_FLAG_KEY)?;
                    self.store.remove(USER_KEY)?;
                    AuthState::Unauthenticated
                }
            },
            _ => AuthState::Unauthenticated,
        };
        Ok(&self.state)
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<SessionUser, DatamartError> {
        let user = self.identity.authenticate(username, password)?;
        let raw = serde_json::to_string(&user)
            .map_err(|err| DatamartError::Filesystem(err.to_string()))?;
        self.store.set(AUTH_FLAG_KEY, "true")?;
        self.store.set(USER_KEY, &raw)?;
        self.state = AuthState::Authenticated(user.clone());
        Ok(user)
    }

    pub fn logout(&mut self) -> Result<(), DatamartError> {
        self.store.remove(AUTH_FLAG_KEY)?;
        self.store.remove(USER_KEY)?;
        self.state = AuthState::Unauthenticated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::store::MemoryStore;

    fn gate() -> SessionGate<MemoryStore, StaticIdentityProvider> {
        SessionGate::new(MemoryStore::new(), StaticIdentityProvider)
    }

    #[test]
    fn starts_loading_until_rehydrated() {
        let mut gate = gate();
        assert_eq!(*gate.state(), AuthState::Loading);
        gate.rehydrate().unwrap();
        assert_eq!(*gate.state(), AuthState::Unauthenticated);
    }

    #[test]
    fn login_persists_user_record() {
        let mut gate = gate();
        gate.rehydrate().unwrap();
        let user = gate.login("admin", "admin").unwrap();
        assert!(gate.is_authenticated());
        assert_eq!(user.role, UserRole::Admin);
        assert_eq!(gate.store().get(AUTH_FLAG_KEY).unwrap().as_deref(), Some("true"));
        assert!(gate.store().get(USER_KEY).unwrap().is_some());
    }

    #[test]
    fn bad_credentials_leave_state_unchanged() {
        let mut gate = gate();
        gate.rehydrate().unwrap();
        let err = gate.login("admin", "hunter2").unwrap_err();
        assert_matches!(err, DatamartError::InvalidCredentials);
        assert!(!gate.is_authenticated());
        assert_eq!(gate.store().get(AUTH_FLAG_KEY).unwrap(), None);
    }

    #[test]
    fn rehydrate_restores_session() {
        let store = MemoryStore::new();
        {
            let mut first = SessionGate::new(&store, StaticIdentityProvider);
            first.rehydrate().unwrap();
            first.login("admin", "admin").unwrap();
        }
        let mut second = SessionGate::new(&store, StaticIdentityProvider);
        second.rehydrate().unwrap();
        assert!(second.is_authenticated());
        assert_eq!(second.current_user().unwrap().username, "admin");
    }

    #[test]
    fn logout_clears_persisted_session() {
        let store = MemoryStore::new();
        {
            let mut gate = SessionGate::new(&store, StaticIdentityProvider);
            gate.rehydrate().unwrap();
            gate.login("admin", "admin").unwrap();
            gate.logout().unwrap();
        }
        let mut fresh = SessionGate::new(&store, StaticIdentityProvider);
        fresh.rehydrate().unwrap();
        assert_eq!(*fresh.state(), AuthState::Unauthenticated);
    }

    #[test]
    fn corrupt_user_record_is_discarded() {
        let store = MemoryStore::new();
        store.set(AUTH_FLAG_KEY, "true").unwrap();
        store.set(USER_KEY, "{not json").unwrap();

        let mut gate = SessionGate::new(&store, StaticIdentityProvider);
        gate.rehydrate().unwrap();
        assert_eq!(*gate.state(), AuthState::Unauthenticated);
        assert_eq!(store.get(AUTH_FLAG_KEY).unwrap(), None);
        assert_eq!(store.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn protected_operations_refuse_without_session() {
        let mut gate = gate();
        gate.rehydrate().unwrap();
        assert_matches!(
            gate.require_authenticated().unwrap_err(),
            DatamartError::NotAuthenticated
        );
    }
}
