//! Change Notification
//!
//! Every non-quiet `put`/`remove` emits a [`ChangeEvent`] to registered
//! observers. Delivery is synchronous and in mutation order: the event fires
//! on the thread that issued the mutation, after the engine write was issued
//! inside its committed transaction. Events are ephemeral; nothing is
//! persisted or replayed.
//!
//! Observers register through `Store::on_change` and deregister with the
//! returned [`ObserverId`].

pub mod notifier;
pub mod types;

// Re-export commonly used types
pub use notifier::{ChangeNotifier, ObserverId};
pub use types::{ChangeEvent, ChangeOp};
