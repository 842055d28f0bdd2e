//! Process-wide session coordinator.
//!
//! All identity changes funnel through [`SessionResolver`]: the persisted token
//! is the only source of truth, and the published [`SessionState`] is always a
//! projection of it. Consumers either poll (`current_user`, `is_authenticated`)
//! or subscribe to the watch channel. Inside a tokio runtime an authenticated
//! session is torn down when its claims expire, so subscribers see the lapse
//! without polling.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::decoder::try_decode;
use crate::error::{AuthError, AuthResult};
use crate::principal::Principal;
use crate::store::CredentialStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No resolution pass has completed yet; treat as loading.
    Unknown,
    Authenticated(Principal),
    Anonymous,
}

impl SessionState {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            SessionState::Authenticated(principal) => Some(principal),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Unknown => "unknown",
            SessionState::Authenticated(_) => "authenticated",
            SessionState::Anonymous => "anonymous",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationReason {
    Logout,
    Unauthorized,
    Expired,
    Malformed,
    LoginFailed,
}

impl InvalidationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidationReason::Logout => "logout",
            InvalidationReason::Unauthorized => "unauthorized",
            InvalidationReason::Expired => "expired",
            InvalidationReason::Malformed => "malformed",
            InvalidationReason::LoginFailed => "login_failed",
        }
    }
}

/// Generation of the session slot. Every write to the slot advances it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SessionEpoch(u64);

/// Bookkeeping guarded by the resolver's single mutex.
#[derive(Default)]
struct Slot {
    epoch: u64,
    /// Expiry of the published principal's claims, if one is published.
    expires_at: Option<DateTime<Utc>>,
    expiry_timer: Option<AbortHandle>,
}

impl Slot {
    fn disarm(&mut self) {
        self.expires_at = None;
        if let Some(timer) = self.expiry_timer.take() {
            timer.abort();
        }
    }
}

struct Shared {
    store: Arc<dyn CredentialStore>,
    ttl_hours: u32,
    state: watch::Sender<SessionState>,
    slot: Mutex<Slot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn clear_locked(&self, slot: &mut Slot, reason: InvalidationReason) {
        self.store.clear();
        slot.epoch += 1;
        slot.disarm();
        debug!(reason = reason.as_str(), "session slot cleared");
    }

    fn publish(&self, next: SessionState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
        if changed {
            info!(state = next.label(), "session state changed");
        }
    }

    /// Fired by the expiry timer armed at `armed_at`; a no-op once the slot moved on.
    fn expire(&self, armed_at: u64) {
        let mut slot = self.lock();
        if slot.epoch != armed_at {
            return;
        }
        slot.expiry_timer = None;
        self.clear_locked(&mut slot, InvalidationReason::Expired);
        self.publish(SessionState::Anonymous);
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.slot
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .disarm();
    }
}

pub struct SessionResolver {
    shared: Arc<Shared>,
}

impl SessionResolver {
    pub fn new(store: Arc<dyn CredentialStore>, config: &SessionConfig) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        Self {
            shared: Arc::new(Shared {
                store,
                ttl_hours: config.ttl_hours,
                state,
                slot: Mutex::new(Slot::default()),
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.shared.store
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    /// The last published state. Goes back to the store only when the published
    /// principal's claims have lapsed.
    pub fn snapshot(&self) -> SessionState {
        self.snapshot_at(Utc::now())
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> SessionState {
        let lapsed = self
            .shared
            .lock()
            .expires_at
            .is_some_and(|expires_at| expires_at <= now);
        if lapsed {
            return self.resolve_at(now);
        }
        self.shared.state.borrow().clone()
    }

    pub fn epoch(&self) -> SessionEpoch {
        SessionEpoch(self.shared.lock().epoch)
    }

    /// Runs a resolution pass against the store.
    pub fn resolve(&self) -> SessionState {
        self.resolve_at(Utc::now())
    }

    /// Resolution pass at a fixed instant. An expired or undecodable persisted
    /// token is cleared and the session becomes anonymous.
    pub fn resolve_at(&self, now: DateTime<Utc>) -> SessionState {
        let shared = &self.shared;
        let mut slot = shared.lock();

        let next = match shared.store.read() {
            None => {
                slot.disarm();
                SessionState::Anonymous
            }
            Some(token) => match try_decode(&token) {
                Ok(claims) if !claims.is_expired_at(now) => {
                    if slot.expires_at != claims.expires_at {
                        self.arm_expiry(&mut slot, claims.expires_at);
                    }
                    SessionState::Authenticated(Principal::from(&claims))
                }
                Ok(_) => {
                    shared.clear_locked(&mut slot, InvalidationReason::Expired);
                    SessionState::Anonymous
                }
                Err(err) => {
                    debug!(error = %err, "persisted token unreadable");
                    shared.clear_locked(&mut slot, InvalidationReason::Malformed);
                    SessionState::Anonymous
                }
            },
        };

        shared.publish(next.clone());
        next
    }

    /// Re-derives the principal; never reports an expired session.
    pub fn current_user(&self) -> Option<Principal> {
        match self.resolve() {
            SessionState::Authenticated(principal) => Some(principal),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    /// The bearer credential to attach to outbound calls, if a live one exists.
    pub fn token(&self) -> Option<String> {
        let token = self.shared.store.read()?;
        match self.resolve() {
            SessionState::Authenticated(_) => Some(token),
            _ => None,
        }
    }

    /// Adopts a freshly issued token: decode, persist, publish. Nothing is
    /// retained when the token is unusable.
    pub fn establish(&self, token: &str) -> AuthResult<Principal> {
        let mut slot = self.shared.lock();
        self.establish_locked(&mut slot, token)
    }

    /// Like [`establish`](Self::establish), but refuses when the slot was written
    /// after `seen` was captured, so a late login response cannot resurrect a
    /// session that has since been torn down.
    pub fn establish_if_current(&self, seen: SessionEpoch, token: &str) -> AuthResult<Principal> {
        let mut slot = self.shared.lock();
        if slot.epoch != seen.0 {
            debug!(seen = seen.0, current = slot.epoch, "discarding stale login response");
            return Err(AuthError::Superseded);
        }
        self.establish_locked(&mut slot, token)
    }

    /// Clears the store and publishes `Anonymous`. Safe to call repeatedly and
    /// from racing callers; all of them converge on the same terminal state.
    pub fn invalidate(&self, reason: InvalidationReason) {
        let mut slot = self.shared.lock();
        self.shared.clear_locked(&mut slot, reason);
        self.shared.publish(SessionState::Anonymous);
    }

    /// Invalidates only if nothing was written to the slot since `seen`.
    pub fn invalidate_if_current(&self, seen: SessionEpoch, reason: InvalidationReason) -> bool {
        let mut slot = self.shared.lock();
        if slot.epoch != seen.0 {
            return false;
        }
        self.shared.clear_locked(&mut slot, reason);
        self.shared.publish(SessionState::Anonymous);
        true
    }

    fn establish_locked(&self, slot: &mut Slot, token: &str) -> AuthResult<Principal> {
        let claims = try_decode(token)?;
        if claims.is_expired_at(Utc::now()) {
            return Err(AuthError::Expired);
        }

        self.shared.store.save(token, self.shared.ttl_hours)?;
        slot.epoch += 1;
        self.arm_expiry(slot, claims.expires_at);

        let principal = Principal::from(&claims);
        info!(user_id = %principal.id, role = %principal.role, "session established");
        self.shared
            .publish(SessionState::Authenticated(principal.clone()));
        Ok(principal)
    }

    /// Schedules the teardown of the current slot generation at `expires_at`.
    /// Outside a runtime expiry is only enforced on access.
    fn arm_expiry(&self, slot: &mut Slot, expires_at: Option<DateTime<Utc>>) {
        slot.disarm();
        slot.expires_at = expires_at;
        let Some(expires_at) = expires_at else {
            return;
        };
        let Ok(runtime) = Handle::try_current() else {
            debug!("no async runtime; session expiry checked on access only");
            return;
        };

        let delay = (expires_at - Utc::now()).to_std().unwrap_or_default();
        let armed_at = slot.epoch;
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let timer = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = shared.upgrade() {
                shared.expire(armed_at);
            }
        });
        slot.expiry_timer = Some(timer.abort_handle());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::Role;
    use crate::store::{CookieJar, DetachedStore};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};

    fn token(payload: Value) -> String {
        encode(&Header::default(), &payload, &EncodingKey::from_secret(b"server-side"))
            .expect("sign token")
    }

    fn live_token(role: &str) -> String {
        token(json!({
            "user_id": "42",
            "login": "someone",
            "role": role,
            "cities": ["Bocholt"],
            "exp": Utc::now().timestamp() + 3_600,
            "iat": Utc::now().timestamp()
        }))
    }

    fn resolver() -> (Arc<CookieJar>, SessionResolver) {
        let config = SessionConfig::default();
        let jar = Arc::new(CookieJar::new(&config));
        let resolver = SessionResolver::new(jar.clone(), &config);
        (jar, resolver)
    }

    #[test]
    fn starts_unknown_and_resolves_anonymous_on_empty_store() {
        let (_, resolver) = resolver();
        assert_eq!(resolver.snapshot(), SessionState::Unknown);
        assert_eq!(resolver.resolve(), SessionState::Anonymous);
        assert!(!resolver.is_authenticated());
    }

    #[test]
    fn resolves_persisted_live_token() {
        let (jar, resolver) = resolver();
        jar.save(&live_token("courier"), 24).expect("save");

        let state = resolver.resolve();
        let principal = state.principal().expect("principal");
        assert_eq!(principal.id, "42");
        assert_eq!(principal.role, Role::Courier);
        assert_eq!(principal.scoped_cities, vec!["Bocholt"]);
    }

    #[test]
    fn expired_persisted_token_is_cleared() {
        let (jar, resolver) = resolver();
        let expired = token(json!({
            "user_id": "42",
            "login": "someone",
            "role": "manager",
            "exp": Utc::now().timestamp() - 1
        }));
        jar.save(&expired, 24).expect("save");

        assert_eq!(resolver.resolve(), SessionState::Anonymous);
        assert!(jar.read().is_none());
        assert!(resolver.token().is_none());
    }

    #[test]
    fn malformed_persisted_token_falls_back_to_anonymous() {
        let (jar, resolver) = resolver();
        jar.save("garbage", 24).expect("save");
        assert_eq!(resolver.resolve(), SessionState::Anonymous);
        assert!(jar.read().is_none());
    }

    #[test]
    fn session_lapses_once_claims_expire() {
        let (jar, resolver) = resolver();
        let token = token(json!({
            "user_id": "42",
            "login": "someone",
            "role": "manager",
            "exp": Utc::now().timestamp() + 60
        }));
        resolver.establish(&token).expect("establish");

        let later = Utc::now() + chrono::Duration::seconds(120);
        assert_eq!(resolver.resolve_at(later), SessionState::Anonymous);
        assert!(jar.read().is_none());
    }

    #[test]
    fn snapshot_does_not_report_lapsed_claims() {
        let (jar, resolver) = resolver();
        let token = token(json!({
            "user_id": "42",
            "login": "someone",
            "role": "courier",
            "exp": Utc::now().timestamp() + 60
        }));
        resolver.establish(&token).expect("establish");
        assert!(resolver.snapshot().is_authenticated());

        let later = Utc::now() + chrono::Duration::seconds(120);
        assert_eq!(resolver.snapshot_at(later), SessionState::Anonymous);
        assert!(jar.read().is_none());
        assert_eq!(*resolver.subscribe().borrow(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn subscribers_observe_expiry_without_polling() {
        let (jar, resolver) = resolver();
        let mut updates = resolver.subscribe();
        let token = token(json!({
            "user_id": "42",
            "login": "someone",
            "role": "manager",
            "exp": Utc::now().timestamp() + 1
        }));
        resolver.establish(&token).expect("establish");
        assert!(updates.borrow_and_update().is_authenticated());

        tokio::time::timeout(std::time::Duration::from_secs(5), updates.changed())
            .await
            .expect("expiry fires")
            .expect("sender alive");
        assert_eq!(*updates.borrow(), SessionState::Anonymous);
        assert_eq!(resolver.snapshot(), SessionState::Anonymous);
        assert!(jar.read().is_none());
    }

    #[tokio::test]
    async fn expiry_timer_of_a_replaced_session_is_inert() {
        let (_, resolver) = resolver();
        let short = token(json!({
            "user_id": "42",
            "login": "someone",
            "role": "manager",
            "exp": Utc::now().timestamp() + 1
        }));
        resolver.establish(&short).expect("short session");
        resolver.establish(&live_token("courier")).expect("replacement");

        tokio::time::sleep(std::time::Duration::from_millis(2_100)).await;
        let principal = resolver.current_user().expect("replacement still live");
        assert_eq!(principal.role, Role::Courier);
    }

    #[test]
    fn establish_publishes_principal_without_round_trip() {
        let (jar, resolver) = resolver();
        let mut updates = resolver.subscribe();

        let principal = resolver.establish(&live_token("manager")).expect("establish");
        assert_eq!(principal.role, Role::Manager);
        assert!(updates.has_changed().expect("sender alive"));
        assert_eq!(
            updates.borrow_and_update().principal().map(|p| p.id.clone()),
            Some("42".to_string())
        );
        assert!(jar.read().is_some());
        assert_eq!(resolver.current_user(), Some(principal));
    }

    #[test]
    fn establish_rejects_unusable_tokens_without_side_effects() {
        let (jar, resolver) = resolver();
        let expired = token(json!({
            "user_id": "1", "login": "x", "role": "manager",
            "exp": Utc::now().timestamp() - 5
        }));

        assert!(matches!(resolver.establish(&expired), Err(AuthError::Expired)));
        assert!(resolver.establish("nope").is_err());
        assert!(jar.read().is_none());
        assert_eq!(resolver.snapshot(), SessionState::Unknown);
    }

    #[test]
    fn stale_establish_is_refused_after_invalidation() {
        let (jar, resolver) = resolver();
        let seen = resolver.epoch();
        resolver.invalidate(InvalidationReason::Logout);

        let err = resolver
            .establish_if_current(seen, &live_token("manager"))
            .expect_err("stale");
        assert!(matches!(err, AuthError::Superseded));
        assert!(jar.read().is_none());
        assert_eq!(resolver.snapshot(), SessionState::Anonymous);
    }

    #[test]
    fn invalidate_is_idempotent() {
        let (jar, resolver) = resolver();
        resolver.establish(&live_token("courier")).expect("establish");

        resolver.invalidate(InvalidationReason::Logout);
        resolver.invalidate(InvalidationReason::Unauthorized);
        assert_eq!(resolver.snapshot(), SessionState::Anonymous);
        assert!(jar.read().is_none());
    }

    #[test]
    fn invalidate_if_current_respects_newer_session() {
        let (_, resolver) = resolver();
        let seen = resolver.epoch();
        resolver.establish(&live_token("manager")).expect("establish");

        assert!(!resolver.invalidate_if_current(seen, InvalidationReason::LoginFailed));
        assert!(resolver.is_authenticated());
    }

    #[test]
    fn detached_context_never_authenticates() {
        let config = SessionConfig::default();
        let resolver = SessionResolver::new(Arc::new(DetachedStore), &config);
        resolver.establish(&live_token("manager")).expect("adopted in memory only");
        assert_eq!(resolver.resolve(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn racing_teardowns_converge() {
        let (jar, resolver) = resolver();
        let resolver = Arc::new(resolver);
        resolver.establish(&live_token("manager")).expect("establish");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let resolver = resolver.clone();
                tokio::spawn(async move {
                    let reason = if i % 2 == 0 {
                        InvalidationReason::Unauthorized
                    } else {
                        InvalidationReason::Logout
                    };
                    resolver.invalidate(reason);
                })
            })
            .collect();
        for handle in handles {
            handle.await.expect("task");
        }

        assert_eq!(resolver.snapshot(), SessionState::Anonymous);
        assert!(jar.read().is_none());
    }
}
