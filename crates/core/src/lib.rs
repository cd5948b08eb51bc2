//! Shared vocabulary for the ACI security hardening core.
//!
//! This crate defines the trust-tier model, the per-tier security
//! requirement table, the data-classification labels used for pairwise
//! enforcement, and the clock abstraction every other security crate
//! reads time through.

pub mod classification;
pub mod clock;
pub mod tier;

pub use classification::{DataClassification, is_high_value_label};
pub use clock::{Clock, ManualClock, SystemClock};
pub use tier::{ConformanceLevel, SecurityRequirements, TierError, TrustTier};
