//! Account features (auth, account actions) and the notices they surface. The
//! shell and the CLI import these modules so that view and command code stays
//! free of collaborator handling.

pub mod account;
pub mod auth;
pub mod notice;
