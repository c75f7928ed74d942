//! In-memory session state mirrored to a `TokenStore`.

use crate::store::{TokenKey, TokenStore};

/// The token pair currently held by the client.
///
/// Both tokens are replaced together by `apply` and dropped together by
/// `clear`; nothing else mutates them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Session {
    /// Rehydrate from storage. Empty strings count as absent.
    pub fn load(store: &dyn TokenStore) -> Self {
        let read = |key| store.get(key).filter(|token: &String| !token.is_empty());
        Self {
            access_token: read(TokenKey::AccessToken),
            refresh_token: read(TokenKey::RefreshToken),
        }
    }

    /// Value for the Authorization header, if a token is held.
    pub fn bearer(&self) -> Option<String> {
        self.access_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .map(|token| format!("Bearer {token}"))
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// The pair to present to the refresh endpoint, only when both are held.
    pub fn refresh_pair(&self) -> Option<(String, String)> {
        match (self.access_token.as_deref(), self.refresh_token.as_deref()) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                Some((access.to_string(), refresh.to_string()))
            }
            _ => None,
        }
    }

    pub(crate) fn apply(&mut self, store: &dyn TokenStore, access_token: &str, refresh_token: &str) {
        self.access_token = Some(access_token.to_string());
        self.refresh_token = Some(refresh_token.to_string());
        store.set(TokenKey::AccessToken, access_token);
        store.set(TokenKey::RefreshToken, refresh_token);
    }

    pub(crate) fn clear(&mut self, store: &dyn TokenStore) {
        self.access_token = None;
        self.refresh_token = None;
        store.remove(TokenKey::AccessToken);
        store.remove(TokenKey::RefreshToken);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTokenStore;

    #[test]
    fn load_treats_empty_strings_as_absent() {
        let store = MemoryTokenStore::new();
        store.set(TokenKey::AccessToken, "A1");
        store.set(TokenKey::RefreshToken, "");
        let session = Session::load(&store);
        assert_eq!(session.access_token.as_deref(), Some("A1"));
        assert!(!session.has_refresh_token());
        assert!(session.refresh_pair().is_none());
    }

    #[test]
    fn apply_and_clear_mirror_to_store() {
        let store = MemoryTokenStore::new();
        let mut session = Session::default();
        assert!(session.bearer().is_none());

        session.apply(&store, "A1", "R1");
        assert_eq!(session.bearer().as_deref(), Some("Bearer A1"));
        assert_eq!(session.refresh_pair(), Some(("A1".to_string(), "R1".to_string())));
        assert_eq!(Session::load(&store), session);

        session.clear(&store);
        assert_eq!(session, Session::default());
        assert_eq!(Session::load(&store), Session::default());
    }
}
