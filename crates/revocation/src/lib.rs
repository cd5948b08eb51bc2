//! Revocation engine with recursive delegation termination.
//!
//! Revoking an agent terminates its delegation subtree, invalidates
//! outstanding tokens, records the revocation locally, and fans events
//! out to subscribers and webhooks. Status reads honor per-tier SLAs:
//! hardened tiers bypass the cache, lower tiers tolerate bounded
//! staleness.

pub mod cache;
pub mod error;
pub mod events;
pub mod service;
pub mod sla;
pub mod testing;
pub mod traits;
pub mod types;

pub use cache::RevocationStatusCache;
pub use error::RevocationError;
pub use events::{EventBus, RevocationEvent, RevocationEventType, Subscription};
pub use service::{RevocationConfig, RevocationService};
pub use sla::RevocationSla;
pub use traits::{Delegation, DelegationRegistry, TokenService, WebhookService};
pub use types::{
    PropagationPolicy, RevocationRecord, RevocationRequest, RevocationResult, RevocationStatus,
};
