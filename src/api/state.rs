//! Application state for the pricing API.

use std::sync::Arc;

use crate::engine::PricingEngine;

/// Shared application state.
///
/// Holds the pricing engine; handlers clone the `Arc` into blocking tasks.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<PricingEngine>,
}

impl AppState {
    /// Creates a new application state around an engine.
    pub fn new(engine: PricingEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Returns a reference to the engine.
    pub fn engine(&self) -> &PricingEngine {
        &self.engine
    }

    pub(crate) fn engine_handle(&self) -> Arc<PricingEngine> {
        Arc::clone(&self.engine)
    }

    /// The actor recorded when a request carries no `x-user-id` header.
    pub fn default_user(&self) -> &str {
        &self.engine.config().pricing().default_user
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::store::LedgerStore;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_default_user_from_config() {
        let engine = PricingEngine::new(
            LedgerStore::open_in_memory().unwrap(),
            Arc::new(EngineConfig::default()),
        );
        let state = AppState::new(engine);
        assert_eq!(state.default_user(), "system");
        assert!(Arc::ptr_eq(&state.engine_handle(), &state.clone().engine_handle()));
    }
}
