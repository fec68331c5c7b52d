//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! `queue` holds the matching state machine and is the only module with
//! real invariants. `notification` decides when to alert subscribers and
//! reaches the outside world through the `subscription` store and `push`
//! sender traits.

pub mod notification;
pub mod push;
pub mod queue;
pub mod subscription;
