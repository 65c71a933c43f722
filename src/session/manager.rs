//! Session Manager - Authentication Orchestrator
//!
//! Single owner of the credential and the current identity. Every request
//! that should carry the credential goes through `authorize`/`execute`, and
//! every authorization failure comes back here to force a logout.
//!
//! Each network operation captures the session epoch before it is issued and
//! commits only if the epoch is unchanged when the response arrives.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast, watch};
use tracing::{debug, info, warn};

use crate::api::endpoints;
use crate::api::request::{ApiRequest, ApiTransport, RequestOutcome};
use crate::api::types::{AuthResponse, LoginRequest, RegisterRequest, UserIdentity};
use crate::config::mask_secret;
use crate::error::{ClientError, Result};
use crate::session::state::{
    RegistrationForm, RestoreOutcome, SessionEvent, SessionSnapshot, SessionState,
};
use crate::session::store::{CredentialStore, PersistedSession};

const DEFAULT_RESTORE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
struct SessionInner {
    state: SessionState,
    credential: Option<String>,
    identity: Option<UserIdentity>,
    epoch: u64,
}

impl SessionInner {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            identity: self.identity.clone(),
            epoch: self.epoch,
        }
    }

    fn clear(&mut self) {
        self.credential = None;
        self.identity = None;
    }
}

/// How a successful authentication was obtained
#[derive(Debug, Clone, Copy)]
enum AuthKind {
    Login,
    Register,
}

pub struct SessionManager {
    transport: Arc<dyn ApiTransport>,
    store: Arc<dyn CredentialStore>,
    inner: RwLock<SessionInner>,
    state_tx: watch::Sender<SessionSnapshot>,
    events: broadcast::Sender<SessionEvent>,
    restore_timeout: Duration,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn ApiTransport>, store: Arc<dyn CredentialStore>) -> Self {
        let (state_tx, _) = watch::channel(SessionSnapshot::default());
        let (events, _) = broadcast::channel(64);

        Self {
            transport,
            store,
            inner: RwLock::new(SessionInner::default()),
            state_tx,
            events,
            restore_timeout: DEFAULT_RESTORE_TIMEOUT,
        }
    }

    /// Bound the "loading" phase of `restore_session`
    pub fn with_restore_timeout(mut self, timeout: Duration) -> Self {
        self.restore_timeout = timeout;
        self
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.read().await.snapshot()
    }

    pub async fn state(&self) -> SessionState {
        self.inner.read().await.state
    }

    pub async fn identity(&self) -> Option<UserIdentity> {
        self.inner.read().await.identity.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state().await == SessionState::Authenticated
    }

    pub async fn epoch(&self) -> u64 {
        self.inner.read().await.epoch
    }

    /// Latest session snapshot, updated on every transition
    pub fn subscribe_state(&self) -> watch::Receiver<SessionSnapshot> {
        self.state_tx.subscribe()
    }

    /// Login/logout and navigation signals
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Authenticate with username and password
    pub async fn login(&self, username: &str, password: &str) -> Result<(String, UserIdentity)> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ClientError::Authentication(
                "username and password are required".to_string(),
            ));
        }

        let request = ApiRequest::post(endpoints::LOGIN).json(&LoginRequest {
            username: username.trim(),
            password,
        })?;

        debug!(username = %username, "Logging in");
        let (epoch, outcome) = self.dispatch(request).await;

        match outcome {
            RequestOutcome::Ok(body) => {
                let auth: AuthResponse = serde_json::from_value(body)?;
                self.commit_authentication(epoch, auth, AuthKind::Login).await
            }
            RequestOutcome::AuthorizationFailure { detail } => {
                self.handle_unauthorized(epoch).await;
                Err(ClientError::Authentication(
                    detail.unwrap_or_else(|| "invalid username or password".to_string()),
                ))
            }
            RequestOutcome::Error(ClientError::Validation(message)) => {
                Err(ClientError::Authentication(message))
            }
            RequestOutcome::Error(e) => Err(e),
        }
    }

    /// Create an account and sign in with it
    pub async fn register(&self, form: &RegistrationForm) -> Result<(String, UserIdentity)> {
        validate_registration(form)?;

        let request = ApiRequest::post(endpoints::REGISTER).json(&RegisterRequest {
            username: form.username.trim(),
            email: form.email.trim(),
            password: &form.password,
        })?;

        debug!(username = %form.username, "Registering account");
        let (epoch, outcome) = self.dispatch(request).await;

        match outcome {
            RequestOutcome::Ok(body) => {
                let auth: AuthResponse = serde_json::from_value(body)?;
                self.commit_authentication(epoch, auth, AuthKind::Register).await
            }
            RequestOutcome::AuthorizationFailure { detail } => {
                self.handle_unauthorized(epoch).await;
                Err(ClientError::Authentication(
                    detail.unwrap_or_else(|| "registration was not authorized".to_string()),
                ))
            }
            RequestOutcome::Error(ClientError::Validation(message)) if reports_duplicate(&message) => {
                Err(ClientError::Conflict(message))
            }
            RequestOutcome::Error(e) => Err(e),
        }
    }

    /// Restore a persisted session at startup
    pub async fn restore_session(&self) -> Result<RestoreOutcome> {
        let persisted = match self.store.load() {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!("Failed to read persisted session: {}", e);
                None
            }
        };

        let Some(persisted) = persisted else {
            debug!("No persisted session found");
            return Ok(RestoreOutcome::Anonymous);
        };

        let epoch = {
            let mut inner = self.inner.write().await;
            if inner.state == SessionState::Authenticated
                && let Some(identity) = inner.identity.clone()
            {
                return Ok(RestoreOutcome::Restored(identity));
            }
            if inner.state == SessionState::Authenticating {
                // Join the restore already in flight instead of superseding it
                let watcher = self.state_tx.subscribe();
                drop(inner);
                return self.await_restore(watcher).await;
            }
            inner.epoch += 1;
            inner.state = SessionState::Authenticating;
            inner.credential = Some(persisted.token.clone());
            inner.identity = None;
            self.publish(&inner);
            inner.epoch
        };

        info!(
            epoch = epoch,
            cached_user = ?persisted.user.as_ref().map(|u| &u.username),
            "Restoring persisted session"
        );

        let request = ApiRequest::get(endpoints::ME).with_bearer(persisted.token.clone());
        let outcome = match tokio::time::timeout(self.restore_timeout, self.transport.send(request))
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => RequestOutcome::Error(ClientError::Network(format!(
                "session restore timed out after {:?}",
                self.restore_timeout
            ))),
        };

        match outcome {
            RequestOutcome::Ok(body) => {
                let identity: UserIdentity = match serde_json::from_value(body) {
                    Ok(identity) => identity,
                    Err(e) => {
                        self.abandon_restore(epoch).await;
                        return Err(e.into());
                    }
                };

                let mut inner = self.inner.write().await;
                if inner.epoch != epoch || inner.state != SessionState::Authenticating {
                    return Err(ClientError::Stale {
                        issued: epoch,
                        current: inner.epoch,
                    });
                }

                inner.state = SessionState::Authenticated;
                inner.identity = Some(identity.clone());
                if let Err(e) = self
                    .store
                    .save(&PersistedSession::new(persisted.token, Some(identity.clone())))
                {
                    warn!("Failed to refresh persisted identity: {}", e);
                }
                self.publish(&inner);
                drop(inner);

                info!(user_id = identity.id, username = %identity.username, "Session restored");
                let _ = self.events.send(SessionEvent::Restored {
                    user_id: identity.id,
                    epoch,
                });
                Ok(RestoreOutcome::Restored(identity))
            }
            RequestOutcome::AuthorizationFailure { .. } => {
                self.handle_unauthorized(epoch).await;
                Ok(RestoreOutcome::Anonymous)
            }
            RequestOutcome::Error(e) => {
                // Keep the persisted credential so the caller can retry
                warn!(epoch = epoch, "Session restore failed: {}", e);
                self.abandon_restore(epoch).await;
                Err(e)
            }
        }
    }

    /// Attach the current credential as a bearer header, if any
    pub async fn authorize(&self, request: ApiRequest) -> ApiRequest {
        let inner = self.inner.read().await;
        attach_credential(request, &inner)
    }

    /// Send an authorized request and decode its JSON body
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let method = request.method;
        let path = request.path.clone();
        let (epoch, outcome) = self.dispatch(request).await;

        match outcome {
            RequestOutcome::Ok(body) => Ok(serde_json::from_value(body)?),
            RequestOutcome::AuthorizationFailure { detail } => {
                debug!(method = %method, path = %path, "Request rejected as unauthorized");
                self.handle_unauthorized(epoch).await;
                Err(ClientError::Authorization(
                    detail.unwrap_or_else(|| "session expired".to_string()),
                ))
            }
            RequestOutcome::Error(e) => Err(e),
        }
    }

    /// Re-fetch the current identity
    pub async fn refresh_identity(&self) -> Result<UserIdentity> {
        if !self.is_authenticated().await {
            return Err(ClientError::Authorization("no active session".to_string()));
        }

        let (epoch, outcome) = self.dispatch(ApiRequest::get(endpoints::ME)).await;
        let body = match outcome {
            RequestOutcome::Ok(body) => body,
            RequestOutcome::AuthorizationFailure { detail } => {
                self.handle_unauthorized(epoch).await;
                return Err(ClientError::Authorization(
                    detail.unwrap_or_else(|| "session expired".to_string()),
                ));
            }
            RequestOutcome::Error(e) => return Err(e),
        };
        let identity: UserIdentity = serde_json::from_value(body)?;

        let mut inner = self.inner.write().await;
        if inner.epoch != epoch || inner.state != SessionState::Authenticated {
            debug!(issued = epoch, current = inner.epoch, "Discarding stale identity");
            return Err(ClientError::Stale {
                issued: epoch,
                current: inner.epoch,
            });
        }

        inner.identity = Some(identity.clone());
        if let Some(token) = inner.credential.clone()
            && let Err(e) = self
                .store
                .save(&PersistedSession::new(token, Some(identity.clone())))
        {
            warn!("Failed to persist refreshed identity: {}", e);
        }
        self.publish(&inner);

        Ok(identity)
    }

    /// Force a logout after the server rejected the credential.
    /// Returns whether this call performed the transition.
    pub async fn on_unauthorized(&self) -> bool {
        let epoch = self.inner.read().await.epoch;
        self.handle_unauthorized(epoch).await
    }

    /// Clear all session state. Never fails.
    pub async fn logout(&self) {
        let mut inner = self.inner.write().await;
        let previous = inner.state;
        inner.clear();
        inner.state = SessionState::Anonymous;
        inner.epoch += 1;

        if let Err(e) = self.store.clear() {
            warn!("Failed to clear persisted session: {}", e);
        }

        self.publish(&inner);
        let epoch = inner.epoch;
        drop(inner);

        info!(previous = %previous, epoch = epoch, "Logged out");
        let _ = self.events.send(SessionEvent::LoggedOut { epoch });
    }

    // Internal operations

    /// Authorize and send, capturing the epoch the request belongs to
    async fn dispatch(&self, request: ApiRequest) -> (u64, RequestOutcome<Value>) {
        let (epoch, request) = {
            let inner = self.inner.read().await;
            (inner.epoch, attach_credential(request, &inner))
        };
        (epoch, self.transport.send(request).await)
    }

    /// At most one forced logout per session epoch
    async fn handle_unauthorized(&self, issued_epoch: u64) -> bool {
        let mut inner = self.inner.write().await;
        if !inner.state.holds_credential() || inner.epoch != issued_epoch {
            debug!(
                state = %inner.state,
                issued = issued_epoch,
                current = inner.epoch,
                "Authorization failure ignored"
            );
            return false;
        }

        inner.clear();
        inner.state = SessionState::Expired;
        self.publish(&inner);

        if let Err(e) = self.store.clear() {
            warn!("Failed to clear persisted session: {}", e);
        }

        inner.state = SessionState::Anonymous;
        inner.epoch += 1;
        self.publish(&inner);
        let epoch = inner.epoch;
        drop(inner);

        warn!(epoch = epoch, "Credential rejected by server, login required");
        let _ = self.events.send(SessionEvent::LoginRequired { epoch });
        true
    }

    async fn commit_authentication(
        &self,
        issued_epoch: u64,
        auth: AuthResponse,
        kind: AuthKind,
    ) -> Result<(String, UserIdentity)> {
        if auth.token.is_empty() {
            return Err(ClientError::Authentication(
                "server returned an empty token".to_string(),
            ));
        }

        let mut inner = self.inner.write().await;
        if inner.epoch != issued_epoch {
            debug!(issued = issued_epoch, current = inner.epoch, "Discarding stale {:?}", kind);
            return Err(ClientError::Stale {
                issued: issued_epoch,
                current: inner.epoch,
            });
        }

        self.store
            .save(&PersistedSession::new(auth.token.clone(), Some(auth.user.clone())))?;

        inner.epoch += 1;
        inner.state = SessionState::Authenticated;
        inner.credential = Some(auth.token.clone());
        inner.identity = Some(auth.user.clone());
        self.publish(&inner);
        let epoch = inner.epoch;
        drop(inner);

        info!(
            user_id = auth.user.id,
            username = %auth.user.username,
            token = %mask_secret(&auth.token),
            epoch = epoch,
            "{:?} succeeded",
            kind
        );
        let _ = self.events.send(SessionEvent::LoggedIn {
            user_id: auth.user.id,
            epoch,
        });

        Ok((auth.token, auth.user))
    }

    async fn await_restore(
        &self,
        mut watcher: watch::Receiver<SessionSnapshot>,
    ) -> Result<RestoreOutcome> {
        debug!("Waiting for the restore in progress");
        let snapshot = watcher
            .wait_for(|s| s.state != SessionState::Authenticating)
            .await
            .map_err(|_| ClientError::Network("session manager shut down".to_string()))?
            .clone();

        match snapshot.identity {
            Some(identity) if snapshot.state == SessionState::Authenticated => {
                Ok(RestoreOutcome::Restored(identity))
            }
            _ => Ok(RestoreOutcome::Anonymous),
        }
    }

    /// Return to anonymous after a failed restore, keeping the persisted slot
    async fn abandon_restore(&self, issued_epoch: u64) {
        let mut inner = self.inner.write().await;
        if inner.epoch != issued_epoch || inner.state != SessionState::Authenticating {
            return;
        }
        inner.clear();
        inner.state = SessionState::Anonymous;
        inner.epoch += 1;
        self.publish(&inner);
    }

    fn publish(&self, inner: &SessionInner) {
        self.state_tx.send_replace(inner.snapshot());
    }
}

fn attach_credential(request: ApiRequest, inner: &SessionInner) -> ApiRequest {
    match (&inner.credential, inner.state.holds_credential()) {
        (Some(token), true) => request.with_bearer(token.clone()),
        _ => request,
    }
}

fn validate_registration(form: &RegistrationForm) -> Result<()> {
    if form.username.trim().is_empty() {
        return Err(ClientError::Validation("username is required".to_string()));
    }
    if form.password.is_empty() {
        return Err(ClientError::Validation("password is required".to_string()));
    }

    let email = form.email.trim();
    let valid_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid_email {
        return Err(ClientError::Validation(format!("invalid email address: {}", email)));
    }

    if let Some(ref confirmation) = form.password_confirmation
        && confirmation != &form.password
    {
        return Err(ClientError::Validation("passwords do not match".to_string()));
    }

    Ok(())
}

fn reports_duplicate(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("already exists") || lower.contains("already registered") || lower.contains("taken")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::MemoryCredentialStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};

    /// Replays canned outcomes per path
    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<HashMap<String, VecDeque<RequestOutcome<Value>>>>,
        seen: Mutex<Vec<ApiRequest>>,
    }

    impl ScriptedTransport {
        fn respond(&self, path: &str, outcome: RequestOutcome<Value>) {
            self.responses
                .lock()
                .entry(path.to_string())
                .or_default()
                .push_back(outcome);
        }

        fn seen(&self) -> Vec<ApiRequest> {
            self.seen.lock().clone()
        }
    }

    #[async_trait]
    impl ApiTransport for ScriptedTransport {
        async fn send(&self, request: ApiRequest) -> RequestOutcome<Value> {
            self.seen.lock().push(request.clone());
            self.responses
                .lock()
                .get_mut(&request.path)
                .and_then(|queue| queue.pop_front())
                .unwrap_or_else(|| RequestOutcome::Error(ClientError::NotFound(request.path)))
        }
    }

    fn user_json(id: u64, username: &str) -> Value {
        json!({"id": id, "username": username, "email": format!("{}@example.org", username), "points": 60})
    }

    fn auth_ok(token: &str, id: u64, username: &str) -> RequestOutcome<Value> {
        RequestOutcome::Ok(json!({"token": token, "user": user_json(id, username)}))
    }

    fn unauthorized() -> RequestOutcome<Value> {
        RequestOutcome::AuthorizationFailure { detail: None }
    }

    fn manager(transport: Arc<ScriptedTransport>, store: Arc<MemoryCredentialStore>) -> SessionManager {
        SessionManager::new(transport, store)
    }

    #[tokio::test]
    async fn test_login_success() {
        let transport = Arc::new(ScriptedTransport::default());
        let store = Arc::new(MemoryCredentialStore::new());
        transport.respond(endpoints::LOGIN, auth_ok("tok-1", 1, "alice"));
        let session = manager(transport.clone(), store.clone());

        let (token, identity) = session.login("alice", "hunter2").await.unwrap();
        assert_eq!(token, "tok-1");
        assert_eq!(identity.username, "alice");
        assert_eq!(session.state().await, SessionState::Authenticated);
        assert_eq!(store.load().unwrap().unwrap().token, "tok-1");

        let request = session.authorize(ApiRequest::get("violations/")).await;
        assert_eq!(request.bearer.as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn test_login_rejects_empty_input_without_io() {
        let transport = Arc::new(ScriptedTransport::default());
        let session = manager(transport.clone(), Arc::new(MemoryCredentialStore::new()));

        let result = session.login("", "pw").await;
        assert!(matches!(result, Err(ClientError::Authentication(_))));
        let result = session.login("alice", "").await;
        assert!(matches!(result, Err(ClientError::Authentication(_))));
        assert!(transport.seen().is_empty());
    }

    #[tokio::test]
    async fn test_login_bad_credentials() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.respond(
            endpoints::LOGIN,
            RequestOutcome::Error(ClientError::Validation(
                "Unable to log in with provided credentials.".to_string(),
            )),
        );
        let session = manager(transport, Arc::new(MemoryCredentialStore::new()));

        let result = session.login("alice", "wrong").await;
        assert!(matches!(result, Err(ClientError::Authentication(_))));
        assert_eq!(session.state().await, SessionState::Anonymous);
        assert!(session.identity().await.is_none());
    }

    #[tokio::test]
    async fn test_register_validation() {
        let transport = Arc::new(ScriptedTransport::default());
        let session = manager(transport.clone(), Arc::new(MemoryCredentialStore::new()));

        let mismatch = RegistrationForm {
            username: "bob".to_string(),
            email: "bob@example.org".to_string(),
            password: "one".to_string(),
            password_confirmation: Some("two".to_string()),
        };
        assert!(matches!(
            session.register(&mismatch).await,
            Err(ClientError::Validation(_))
        ));

        let bad_email = RegistrationForm {
            email: "bob-at-example".to_string(),
            password_confirmation: None,
            ..mismatch.clone()
        };
        assert!(matches!(
            session.register(&bad_email).await,
            Err(ClientError::Validation(_))
        ));
        assert!(transport.seen().is_empty());
    }

    #[tokio::test]
    async fn test_register_conflict() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.respond(
            endpoints::REGISTER,
            RequestOutcome::Error(ClientError::Validation(
                "username: A user with that username already exists.".to_string(),
            )),
        );
        transport.respond(
            endpoints::REGISTER,
            RequestOutcome::Error(ClientError::Conflict("email taken".to_string())),
        );
        let session = manager(transport, Arc::new(MemoryCredentialStore::new()));
        let form = RegistrationForm {
            username: "bob".to_string(),
            email: "bob@example.org".to_string(),
            password: "pw".to_string(),
            password_confirmation: Some("pw".to_string()),
        };

        assert!(matches!(session.register(&form).await, Err(ClientError::Conflict(_))));
        assert!(matches!(session.register(&form).await, Err(ClientError::Conflict(_))));
        assert_eq!(session.state().await, SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_restore_without_credential() {
        let transport = Arc::new(ScriptedTransport::default());
        let session = manager(transport.clone(), Arc::new(MemoryCredentialStore::new()));
        assert_eq!(session.restore_session().await.unwrap(), RestoreOutcome::Anonymous);
        assert!(transport.seen().is_empty());
    }

    #[tokio::test]
    async fn test_restore_success() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.respond(endpoints::ME, RequestOutcome::Ok(user_json(4, "dana")));
        let store = Arc::new(MemoryCredentialStore::with_session(PersistedSession::new(
            "persisted", None,
        )));
        let session = manager(transport.clone(), store.clone());

        let outcome = session.restore_session().await.unwrap();
        assert_eq!(outcome.identity().map(|u| u.id), Some(4));
        assert_eq!(session.state().await, SessionState::Authenticated);
        assert_eq!(transport.seen()[0].bearer.as_deref(), Some("persisted"));
        assert!(store.load().unwrap().unwrap().user.is_some());
    }

    #[tokio::test]
    async fn test_restore_rejected_credential_is_cleared() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.respond(endpoints::ME, unauthorized());
        let store = Arc::new(MemoryCredentialStore::with_session(PersistedSession::new(
            "expired", None,
        )));
        let session = manager(transport, store.clone());

        assert_eq!(session.restore_session().await.unwrap(), RestoreOutcome::Anonymous);
        assert_eq!(session.state().await, SessionState::Anonymous);
        assert!(store.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restore_network_failure_keeps_credential() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.respond(
            endpoints::ME,
            RequestOutcome::Error(ClientError::Network("connection refused".to_string())),
        );
        let store = Arc::new(MemoryCredentialStore::with_session(PersistedSession::new(
            "keep-me", None,
        )));
        let session = manager(transport, store.clone());

        let result = session.restore_session().await;
        assert!(matches!(result, Err(ClientError::Network(_))));
        assert_eq!(session.state().await, SessionState::Anonymous);
        assert_eq!(store.load().unwrap().unwrap().token, "keep-me");
    }

    #[tokio::test]
    async fn test_authorize_is_noop_when_anonymous() {
        let session = manager(
            Arc::new(ScriptedTransport::default()),
            Arc::new(MemoryCredentialStore::new()),
        );
        let request = session.authorize(ApiRequest::get("violations/")).await;
        assert!(request.bearer.is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_forces_single_logout() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.respond(endpoints::LOGIN, auth_ok("tok", 1, "alice"));
        transport.respond("violations/", unauthorized());
        let store = Arc::new(MemoryCredentialStore::new());
        let session = manager(transport, store.clone());
        session.login("alice", "pw").await.unwrap();

        let mut events = session.subscribe_events();
        let result: Result<Value> = session.execute(ApiRequest::get("violations/")).await;
        assert!(matches!(result, Err(ClientError::Authorization(_))));
        assert_eq!(session.state().await, SessionState::Anonymous);
        assert!(session.identity().await.is_none());
        assert!(store.load().unwrap().is_none());

        // Already anonymous: no second signal
        assert!(!session.on_unauthorized().await);
        assert!(matches!(events.try_recv(), Ok(SessionEvent::LoginRequired { .. })));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_logout_never_fails_and_bumps_epoch() {
        let session = manager(
            Arc::new(ScriptedTransport::default()),
            Arc::new(MemoryCredentialStore::new()),
        );
        let before = session.epoch().await;
        session.logout().await;
        session.logout().await;
        assert_eq!(session.epoch().await, before + 2);
        assert_eq!(session.state().await, SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_state_watch_follows_transitions() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.respond(endpoints::LOGIN, auth_ok("tok", 1, "alice"));
        let session = manager(transport, Arc::new(MemoryCredentialStore::new()));
        let watcher = session.subscribe_state();

        session.login("alice", "pw").await.unwrap();
        assert!(watcher.borrow().is_authenticated());
        assert_eq!(watcher.borrow().identity.as_ref().map(|u| u.id), Some(1));

        session.logout().await;
        assert_eq!(watcher.borrow().state, SessionState::Anonymous);
        assert!(watcher.borrow().identity.is_none());
    }

    #[tokio::test]
    async fn test_relogin_overwrites_identity() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.respond(endpoints::LOGIN, auth_ok("tok-a", 1, "alice"));
        transport.respond(endpoints::LOGIN, auth_ok("tok-b", 2, "bob"));
        let store = Arc::new(MemoryCredentialStore::new());
        let session = manager(transport, store.clone());

        session.login("alice", "pw").await.unwrap();
        session.login("bob", "pw").await.unwrap();
        assert_eq!(session.identity().await.map(|u| u.id), Some(2));
        assert_eq!(store.load().unwrap().unwrap().token, "tok-b");
    }
}
