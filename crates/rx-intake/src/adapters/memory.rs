use crate::domain::entities::{Session, UserId};
use crate::domain::errors::SessionError;
use crate::ports::outbound::{SessionMutation, SessionStore};
use chrono::{DateTime, Local};
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory session store.
///
/// Sessions do not survive a restart.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<UserId, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, user_id: &UserId) -> Option<Session> {
        self.sessions.read().get(user_id).cloned()
    }

    fn create_if_absent(&self, user_id: &UserId, now: DateTime<Local>) -> Session {
        self.sessions
            .write()
            .entry(user_id.clone())
            .or_insert_with(|| Session::new(user_id.clone(), now))
            .clone()
    }

    fn put(&self, session: Session) {
        self.sessions.write().insert(session.user_id.clone(), session);
    }

    fn update(
        &self,
        user_id: &UserId,
        mutation: SessionMutation<'_>,
    ) -> Result<Session, SessionError> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(user_id)
            .ok_or_else(|| SessionError::NotFound {
                user_id: user_id.clone(),
            })?;
        mutation(session);
        Ok(session.clone())
    }

    fn delete(&self, user_id: &UserId) -> bool {
        self.sessions.write().remove(user_id).is_some()
    }

    fn purge_idle(
        &self,
        cutoff: DateTime<Local>,
        keep: &(dyn Fn(&UserId) -> bool + Sync),
    ) -> Vec<UserId> {
        let mut sessions = self.sessions.write();
        let expired: Vec<UserId> = sessions
            .values()
            .filter(|s| s.updated_at < cutoff && !keep(&s.user_id))
            .map(|s| s.user_id.clone())
            .collect();
        for user_id in &expired {
            sessions.remove(user_id);
        }
        expired
    }

    fn len(&self) -> usize {
        self.sessions.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{SessionState, Stage};
    use chrono::Duration;

    #[test]
    fn test_create_if_absent_is_idempotent() {
        let store = InMemorySessionStore::new();
        let user = UserId::from("U1");
        let now = Local::now();

        let first = store.create_if_absent(&user, now);
        store
            .update(
                &user,
                Box::new(|s| s.state = SessionState::AwaitingImage { batch: None }),
            )
            .unwrap();
        let second = store.create_if_absent(&user, now + Duration::seconds(5));

        assert_eq!(first.stage(), Stage::AwaitingConsent);
        assert_eq!(second.stage(), Stage::AwaitingImage);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_missing_session_fails() {
        let store = InMemorySessionStore::new();
        let err = store.update(&UserId::from("ghost"), Box::new(|_| {}));
        assert!(matches!(err, Err(SessionError::NotFound { .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = InMemorySessionStore::new();
        let user = UserId::from("U1");
        store.create_if_absent(&user, Local::now());
        assert!(store.delete(&user));
        assert!(!store.delete(&user));
        assert!(store.get(&user).is_none());
    }

    #[test]
    fn test_purge_idle() {
        let store = InMemorySessionStore::new();
        let now = Local::now();
        store.create_if_absent(&UserId::from("old"), now - Duration::hours(30));
        store.create_if_absent(&UserId::from("fresh"), now);

        let purged = store.purge_idle(now - Duration::hours(24), &|_| false);
        assert_eq!(purged, vec![UserId::from("old")]);
        assert_eq!(store.len(), 1);
        assert!(store.get(&UserId::from("fresh")).is_some());
    }

    #[test]
    fn test_purge_idle_keeps_excluded_users() {
        let store = InMemorySessionStore::new();
        let now = Local::now();
        store.create_if_absent(&UserId::from("busy"), now - Duration::hours(30));
        store.create_if_absent(&UserId::from("idle"), now - Duration::hours(30));

        let purged = store.purge_idle(now - Duration::hours(24), &|user| user.as_str() == "busy");
        assert_eq!(purged, vec![UserId::from("idle")]);
        assert!(store.get(&UserId::from("busy")).is_some());
    }
}
