use crate::backend::firebase::{CloudStorage, FirebaseConfig, Firestore, IdentityToolkit};
use crate::features::auth::AuthConfig;
use crate::shell::{AppShell, GateConfig, Services};
use anyhow::Result;
use std::sync::Arc;

/// Settings shared by every subcommand.
#[derive(Clone, Debug)]
pub struct GlobalArgs {
    pub firebase: FirebaseConfig,
    pub gate: GateConfig,
    pub auth: AuthConfig,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(firebase: FirebaseConfig, gate: GateConfig) -> Self {
        Self {
            firebase,
            gate,
            auth: AuthConfig::default(),
        }
    }

    /// Wire the REST adapters into the feature services.
    ///
    /// # Errors
    /// Returns an error if an HTTP client cannot be constructed.
    pub fn services(&self) -> Result<Services> {
        let provider = Arc::new(IdentityToolkit::new(self.firebase.clone())?);
        let store = Arc::new(Firestore::new(self.firebase.clone())?);
        let storage = Arc::new(CloudStorage::new(self.firebase.clone())?);
        Ok(Services::new(provider, store, storage, &self.auth))
    }

    /// Start the shell at `path` on top of the REST adapters.
    ///
    /// # Errors
    /// Returns an error if the services cannot be built.
    pub fn shell(&self, path: &str) -> Result<AppShell> {
        Ok(AppShell::start(self.services()?, self.gate, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use std::time::Duration;

    #[test]
    fn test_global_args_debug_hides_api_key() {
        let args = GlobalArgs::new(
            FirebaseConfig::new(SecretString::from("AIza-secret".to_string()), "demo"),
            GateConfig::new().with_min_display(Duration::from_millis(5)),
        );
        let debug = format!("{args:?}");
        assert!(debug.contains("demo"));
        assert!(!debug.contains("AIza-secret"));
        assert_eq!(args.gate.min_display(), Duration::from_millis(5));
    }

    #[test]
    fn test_services_build_without_network() {
        let args = GlobalArgs::new(
            FirebaseConfig::new(SecretString::from("key".to_string()), "demo"),
            GateConfig::new(),
        );
        assert!(args.services().is_ok());
    }
}
