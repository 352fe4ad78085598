//! # Tidegate (account client)
//!
//! `tidegate` is a thin client over a managed identity backend. It owns no
//! credentials, hashes nothing and issues no tokens; every durable decision is
//! made by the external identity provider, document store and object store,
//! which are injected as trait objects (see [`backend`]).
//!
//! ## Login by username or email
//!
//! A login identifier is either email-shaped (`^\S+@\S+\.\S+$`) or a handle.
//! Handles are resolved to an email through the `users` profile collection
//! before the provider is asked to authenticate. After a verified login the
//! profile collection is consulted again to attach the display handle.
//! Unverified sessions never complete; the caller can offer a resend instead.
//!
//! ## Navigation gate
//!
//! The [`shell`] renders a loading screen after every push/replace navigation
//! and reveals the destination only when the minimum display timer has fired
//! and the destination view reported ready. Back/forward traversal keeps the
//! current view.
//!
//! ## Disclosure
//!
//! Unknown handles and rejected credentials are distinct errors internally but
//! share one user-facing message so the login screen does not confirm which
//! accounts exist.

pub mod backend;
pub mod cli;
pub mod features;
pub mod shell;

pub const GIT_COMMIT_HASH: &str = match option_env!("TIDEGATE_GIT_SHA") {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
