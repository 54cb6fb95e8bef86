//! Add-provider workflow.
//!
//! `want_add_provider` opens the workflow for a content item. The user types
//! a provider key; it is validated locally, priced by the backend and, if the
//! provider accepts the bag, announced on `provider-added` for whichever
//! session shows that content item. Nothing is published on failure.

use parking_lot::Mutex;
use std::sync::Arc;
use tonbag_core::effects::BackendEffects;
use tonbag_core::{ContentKey, ProviderKey};
use tonbag_effects::{EventBus, Subscription};

use crate::errors::AppError;
use crate::events::{ProviderAdded, PROVIDER_ADDED, WANT_ADD_PROVIDER};

/// Check that `raw` is a well-formed provider key.
pub fn validate_provider_key(raw: &str) -> Result<ProviderKey, AppError> {
    ProviderKey::parse(raw)
        .map_err(|_| AppError::invalid_input("provider key", "Invalid provider key format"))
}

/// Validates and prices candidate providers.
pub struct AddProviderFlow {
    bus: EventBus,
    backend: Arc<dyn BackendEffects>,
    requested: Arc<Mutex<Option<ContentKey>>>,
    _open: Subscription,
}

impl AddProviderFlow {
    /// Create the flow and start listening for open requests.
    pub fn new(bus: EventBus, backend: Arc<dyn BackendEffects>) -> Self {
        let requested = Arc::new(Mutex::new(None));
        let slot = requested.clone();
        let open = bus.subscribe(&WANT_ADD_PROVIDER, move |content: &ContentKey| {
            *slot.lock() = Some(content.clone());
        });
        Self {
            bus,
            backend,
            requested,
            _open: open,
        }
    }

    /// Content item the workflow was last opened for.
    pub fn requested(&self) -> Option<ContentKey> {
        self.requested.lock().clone()
    }

    /// Close the workflow without adding anything.
    pub fn dismiss(&self) {
        self.requested.lock().take();
    }

    /// Validate `raw_key`, price it for `content` and announce the draft.
    pub async fn submit(
        &self,
        content: &ContentKey,
        raw_key: &str,
    ) -> Result<ProviderAdded, AppError> {
        let key = validate_provider_key(raw_key)?;

        let rates = self.backend.fetch_provider_rates(content, &key).await?;
        if !rates.success {
            tracing::info!(provider = key.short(), reason = %rates.reason, "provider declined");
            return Err(AppError::provider_rejected(rates.reason));
        }
        let offer = rates
            .provider
            .ok_or_else(|| AppError::backend("rates response carried no offer"))?;
        if offer.key != key {
            return Err(AppError::backend(format!(
                "rates response is for provider {}, expected {}",
                offer.key.short(),
                key.short()
            )));
        }

        let added = ProviderAdded::from_offer(content.clone(), offer);
        {
            let mut requested = self.requested.lock();
            if requested.as_ref() == Some(content) {
                requested.take();
            }
        }
        let delivered = self.bus.publish(&PROVIDER_ADDED, added.clone());
        tracing::info!(
            content = content.short(),
            provider = key.short(),
            delivered,
            "provider added"
        );
        Ok(added)
    }
}

impl std::fmt::Debug for AddProviderFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddProviderFlow")
            .field("requested", &self.requested())
            .finish_non_exhaustive()
    }
}
