use super::gate::Readiness;

/// Client routes. Unknown paths fall back to signup, as `/` does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Signup,
    Login,
    Landing,
}

impl Route {
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        match path.trim_end_matches('/') {
            "/login" => Self::Login,
            "/dummy" => Self::Landing,
            _ => Self::Signup,
        }
    }

    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Signup => "/signup",
            Self::Login => "/login",
            Self::Landing => "/dummy",
        }
    }

    /// Routes that redirect to login without a session.
    #[must_use]
    pub const fn requires_session(self) -> bool {
        matches!(self, Self::Landing)
    }

    /// The landing view hydrates from the session hub before it is revealed.
    #[must_use]
    pub const fn readiness(self) -> Readiness {
        match self {
            Self::Landing => Readiness::Deferred,
            Self::Signup | Self::Login => Readiness::Immediate,
        }
    }
}
