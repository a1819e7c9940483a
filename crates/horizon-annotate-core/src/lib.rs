//! Core systems for Horizon Annotate.
//!
//! This crate provides the foundational components of the Horizon Annotate
//! labeling engine:
//!
//! - **Events**: Insertion-ordered, named-callback listener maps used for
//!   controller-to-controller notification
//! - **Store**: Session-scoped dynamic state accessed through opaque handles
//! - **Ready Latch**: A resolve-once gate for content that loads after its
//!   controller is constructed
//! - **Identifiers**: Generation of stable ids for regions and results
//!
//! Everything here is session-scoped: a labeling session owns its `Store` and
//! its event maps, and dropping the session drops all of them. There are no
//! process-wide registries.
//!
//! # Events Example
//!
//! ```
//! use horizon_annotate_core::Events;
//! use serde_json::json;
//!
//! let events = Events::new();
//!
//! let id = events.on("label-selected", |payload| {
//!     println!("selected: {}", payload);
//! });
//!
//! events.invoke("label-selected", &json!({"value": "Positive"}));
//! events.off("label-selected", id);
//! ```
//!
//! # Store Example
//!
//! ```
//! use horizon_annotate_core::Store;
//! use serde_json::json;
//!
//! let store = Store::new();
//! let handle = store.alloc(json!({"selected": []}));
//!
//! store.patch(handle, json!({"selected": ["Positive"]})).unwrap();
//! assert_eq!(store.get(handle).unwrap()["selected"][0], "Positive");
//! ```

mod error;
mod events;
mod id;
pub mod logging;
mod ready;
mod store;

pub use error::{CoreError, CoreResult, StoreError, StoreResult};
pub use events::{EventPayload, Events, ListenerId};
pub use id::generate_id;
pub use ready::ReadyLatch;
pub use store::{StateHandle, Store};
