//! Application shell: routing history, the navigation gate, the session hub and
//! the screen-local notice. User actions go through the shell, which calls the
//! feature services, publishes session changes and navigates. Errors stop at
//! the action that caused them and become the notice for the current screen.

pub mod gate;
pub mod routes;
pub mod session;

pub use gate::{
    Activation, GateConfig, GateSnapshot, LoadingState, NavigationGate, NavigationKind, Readiness,
};
pub use routes::Route;
pub use session::SessionHub;

use crate::backend::{DocumentStore, FederatedToken, IdentityProvider, ObjectStorage, Session};
use crate::features::account::{self, AccountService};
use crate::features::auth::{
    AuthConfig, AuthError, CompletedSession, FederatedLogin, LoginService, SignupRequest,
    SignupService, VERIFICATION_SENT_MESSAGE,
};
use crate::features::notice::Notice;
use secrecy::SecretString;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

const FEDERATED_VERIFICATION_MESSAGE: &str =
    "A verification email has been sent to your Google account.";

/// Feature services wired to one set of collaborators.
#[derive(Clone)]
pub struct Services {
    pub login: LoginService,
    pub signup: SignupService,
    pub account: AccountService,
}

impl Services {
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn ObjectStorage>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            login: LoginService::new(provider.clone(), store.clone(), config.clone()),
            signup: SignupService::new(provider.clone(), store.clone(), config.clone()),
            account: AccountService::new(provider, store, storage, config.clone()),
        }
    }
}

/// What the current screen shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum View {
    Loading,
    Signup,
    Login { can_resend_verification: bool },
    Landing {
        handle: String,
        greeting: String,
        avatar_url: Option<String>,
        avatar_initial: char,
    },
}

pub struct AppShell {
    services: Services,
    sessions: SessionHub,
    session_events: watch::Receiver<Option<CompletedSession>>,
    gate: NavigationGate,
    history: Vec<Route>,
    cursor: usize,
    notice: Option<Notice>,
    unverified: Option<Session>,
}

impl AppShell {
    /// Start the shell at `path`. Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(services: Services, gate: GateConfig, path: &str) -> Self {
        let sessions = SessionHub::new();
        let session_events = sessions.subscribe();
        let mut route = Route::from_path(path);
        if route.requires_session() {
            route = Route::Login;
        }

        let shell = Self {
            services,
            sessions,
            session_events,
            gate: NavigationGate::mount(gate, route.readiness()),
            history: vec![route],
            cursor: 0,
            notice: None,
            unverified: None,
        };
        let activation = shell.gate.activation();
        shell.hydrate(activation);
        shell
    }

    #[must_use]
    pub fn route(&self) -> Route {
        self.history[self.cursor]
    }

    #[must_use]
    pub fn loading_state(&self) -> LoadingState {
        self.gate.state()
    }

    #[must_use]
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionHub {
        &self.sessions
    }

    #[must_use]
    pub fn gate(&self) -> &NavigationGate {
        &self.gate
    }

    /// Current screen; the loading view hides the route until the gate opens.
    #[must_use]
    pub fn view(&self) -> View {
        if self.gate.state() == LoadingState::Loading {
            return View::Loading;
        }
        match self.route() {
            Route::Signup => View::Signup,
            Route::Login => View::Login {
                can_resend_verification: self.unverified.is_some(),
            },
            Route::Landing => self.sessions.current().map_or(
                View::Login {
                    can_resend_verification: false,
                },
                |current| View::Landing {
                    greeting: account::greeting(&current.handle),
                    avatar_initial: account::avatar_initial(&current.handle),
                    avatar_url: current.session.avatar_url,
                    handle: current.handle,
                },
            ),
        }
    }

    /// Wait for the gate to reveal the current route.
    pub async fn ready(&self) -> Activation {
        self.gate.ready().await
    }

    /// Push or replace navigation to `path`; guarded routes redirect to login.
    pub fn navigate(&mut self, path: &str, kind: NavigationKind) {
        self.go(Route::from_path(path), kind);
    }

    pub fn back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.traverse()
    }

    pub fn forward(&mut self) -> bool {
        if self.cursor + 1 >= self.history.len() {
            return false;
        }
        self.cursor += 1;
        self.traverse()
    }

    fn traverse(&mut self) -> bool {
        self.gate
            .navigate(NavigationKind::Traverse, self.route().readiness());
        self.notice = None;
        debug!(route = self.route().path(), "history traversal");
        if self.route().requires_session() && !self.sessions.is_signed_in() {
            self.go(Route::Login, NavigationKind::Replace);
        }
        true
    }

    fn go(&mut self, route: Route, kind: NavigationKind) {
        let (route, kind) = if route.requires_session() && !self.sessions.is_signed_in() {
            debug!(from = route.path(), "no session, redirecting to login");
            (Route::Login, NavigationKind::Replace)
        } else {
            (route, kind)
        };

        match kind {
            NavigationKind::Push => {
                self.history.truncate(self.cursor + 1);
                self.history.push(route);
                self.cursor = self.history.len() - 1;
            }
            NavigationKind::Replace | NavigationKind::Traverse => {
                self.history[self.cursor] = route;
            }
        }
        if route != Route::Login {
            self.unverified = None;
        }

        if let Some(activation) = self.gate.navigate(kind, route.readiness()) {
            self.hydrate(activation);
        }
    }

    /// Landing hydration: the view is ready once it can read the session.
    fn hydrate(&self, activation: Activation) {
        if self.route().readiness() == Readiness::Deferred && self.sessions.is_signed_in() {
            self.gate.mark_view_ready(activation);
        }
    }

    /// React to the latest session change; leaves a guarded route when the
    /// session is gone.
    pub fn sync_session(&mut self) {
        let signed_in = self.session_events.borrow_and_update().is_some();
        if !signed_in && self.route().requires_session() {
            info!("session ended, leaving landing view");
            self.go(Route::Login, NavigationKind::Replace);
        }
    }

    /// Wait for the next session change and apply it. Returns `false` once the
    /// hub is gone.
    pub async fn session_changed(&mut self) -> bool {
        if self.session_events.changed().await.is_err() {
            return false;
        }
        self.sync_session();
        true
    }

    fn fail(&mut self, err: &AuthError) -> bool {
        debug!(error = %err, "action failed");
        self.notice = Some(err.notice());
        false
    }

    fn complete(&mut self, completed: CompletedSession) {
        self.unverified = None;
        self.sessions.set(completed);
        self.sync_session();
    }

    pub async fn submit_login(&mut self, identifier: &str, secret: &SecretString) -> bool {
        self.notice = None;
        match self.services.login.login(identifier, secret).await {
            Ok(completed) => {
                self.complete(completed);
                self.go(Route::Landing, NavigationKind::Push);
                true
            }
            Err(AuthError::EmailUnverified { session }) => {
                let err = AuthError::EmailUnverified {
                    session: session.clone(),
                };
                self.unverified = Some(*session);
                self.fail(&err)
            }
            Err(err) => self.fail(&err),
        }
    }

    /// Resend verification for the account whose login was just blocked.
    pub async fn resend_verification(&mut self) -> bool {
        let Some(session) = self.unverified.clone() else {
            self.notice = Some(Notice::error("Please log in first."));
            return false;
        };
        match self.services.login.resend_verification(&session).await {
            Ok(()) => {
                self.notice = Some(Notice::success(VERIFICATION_SENT_MESSAGE));
                true
            }
            Err(err) => self.fail(&err),
        }
    }

    /// Register and, after the redirect delay, move to the login view.
    pub async fn submit_signup(&mut self, request: &SignupRequest) -> bool {
        self.notice = None;
        match self.services.signup.signup(request).await {
            Ok(outcome) => {
                self.notice = Some(Notice::success(VERIFICATION_SENT_MESSAGE));
                tokio::time::sleep(outcome.redirect_after).await;
                self.go(Route::Login, NavigationKind::Push);
                true
            }
            Err(err) => self.fail(&err),
        }
    }

    pub async fn submit_federated(&mut self, token: &FederatedToken, signup: bool) -> bool {
        self.notice = None;
        let result = if signup {
            self.services.signup.signup_federated(token).await
        } else {
            self.services.login.login_federated(token).await
        };
        match result {
            Ok(FederatedLogin {
                completed,
                verification_sent,
                ..
            }) => {
                self.complete(completed);
                self.go(Route::Landing, NavigationKind::Push);
                if verification_sent {
                    self.notice = Some(Notice::success(FEDERATED_VERIFICATION_MESSAGE));
                }
                true
            }
            Err(err) => self.fail(&err),
        }
    }

    fn signed_in(&mut self) -> Option<CompletedSession> {
        let current = self.sessions.current();
        if current.is_none() {
            self.notice = Some(Notice::error("You are not signed in."));
        }
        current
    }

    pub async fn rename(&mut self, new_handle: &str) -> bool {
        self.notice = None;
        let Some(current) = self.signed_in() else {
            return false;
        };
        match self.services.account.rename(&current, new_handle).await {
            Ok(updated) => {
                self.complete(updated);
                self.notice = Some(Notice::success("Username updated successfully!"));
                true
            }
            Err(err) => self.fail(&err),
        }
    }

    pub async fn change_secret(&mut self, new_secret: &SecretString) -> bool {
        self.notice = None;
        let Some(current) = self.signed_in() else {
            return false;
        };
        match self.services.account.change_secret(&current, new_secret).await {
            Ok(updated) => {
                self.complete(updated);
                self.notice = Some(Notice::success("Password updated successfully!"));
                true
            }
            Err(err) => self.fail(&err),
        }
    }

    pub async fn upload_avatar(&mut self, bytes: Vec<u8>, content_type: &str) -> bool {
        self.notice = None;
        let Some(current) = self.signed_in() else {
            return false;
        };
        match self
            .services
            .account
            .upload_avatar(&current, bytes, content_type)
            .await
        {
            Ok(updated) => {
                self.complete(updated);
                self.notice = Some(Notice::success("Profile picture updated successfully!"));
                true
            }
            Err(err) => self.fail(&err),
        }
    }

    /// Sign out and return to the login view, even if the provider call fails.
    pub async fn sign_out(&mut self) -> bool {
        self.notice = None;
        let Some(current) = self.signed_in() else {
            return false;
        };
        let result = self.services.account.sign_out(&current).await;
        self.sessions.clear();
        self.go(Route::Login, NavigationKind::Push);
        self.sync_session();
        match result {
            Ok(()) => true,
            Err(err) => self.fail(&err),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use std::time::Duration;

    fn shell(backend: &Arc<MemoryBackend>, path: &str) -> AppShell {
        let config = AuthConfig::new();
        let services = Services::new(backend.clone(), backend.clone(), backend.clone(), &config);
        AppShell::start(
            services,
            GateConfig::new().with_min_display(Duration::from_millis(10)),
            path,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn guarded_start_lands_on_login() {
        let backend = Arc::new(MemoryBackend::new());
        let shell = shell(&backend, "/dummy");
        assert_eq!(shell.route(), Route::Login);
        assert_eq!(shell.view(), View::Loading);
        shell.ready().await;
        assert_eq!(
            shell.view(),
            View::Login {
                can_resend_verification: false
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn back_does_not_reset_the_gate() {
        let backend = Arc::new(MemoryBackend::new());
        let mut shell = shell(&backend, "/");
        shell.ready().await;
        shell.navigate("/login", NavigationKind::Push);
        shell.ready().await;
        let activation = shell.gate().activation();

        assert!(shell.back());
        assert_eq!(shell.route(), Route::Signup);
        assert_eq!(shell.gate().activation(), activation);
        assert_eq!(shell.view(), View::Signup);
        assert!(shell.forward());
        assert_eq!(shell.route(), Route::Login);
        assert!(!shell.forward());
    }

    #[tokio::test(start_paused = true)]
    async fn unverified_login_offers_resend() {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed_account("a@b.com", "hunter22", false).await;
        let mut shell = shell(&backend, "/login");
        shell.ready().await;

        let secret = SecretString::from("hunter22".to_string());
        assert!(!shell.submit_login("a@b.com", &secret).await);
        assert_eq!(
            shell.notice().map(|notice| notice.message.as_str()),
            Some("Please verify your email before logging in.")
        );
        assert_eq!(
            shell.view(),
            View::Login {
                can_resend_verification: true
            }
        );

        assert!(shell.resend_verification().await);
        assert_eq!(
            shell.notice().map(|notice| notice.message.as_str()),
            Some(VERIFICATION_SENT_MESSAGE)
        );
    }
}
