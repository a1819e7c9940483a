//! A declarative annotation engine for data-labeling interfaces.
//!
//! Horizon Annotate turns an XML-like labeling configuration into a typed
//! tree of tag controllers, wires them together over a communication bus,
//! and maps user annotations onto a serializable result format:
//!
//! - **Tags**: one controller per configuration node — object tags hold the
//!   data being annotated, control tags select and label, visual tags lay
//!   out ([`tags`])
//! - **Communication bus**: name/toname and parent/child adjacency decide
//!   which controllers hear each other's events ([`comms`])
//! - **Regions**: annotated spans with typed result payloads that round-trip
//!   losslessly through the wire format ([`regions`], [`result`])
//! - **Session**: the per-annotation container tying it all together
//!   ([`Session`], [`SessionBuilder`])
//!
//! Rendering is delegated: the engine hands the UI layer fully-resolved
//! [`RenderNode`]s and the UI layer calls back into controllers for user
//! interactions.
//!
//! # Example
//!
//! ```
//! use horizon_annotate::prelude::*;
//! use horizon_annotate::tags::control::{LabelTag, LabelsTag};
//!
//! let config = r#"
//! <View>
//!   <Labels name="sentiment" toName="article" choice="single">
//!     <Label value="Positive"/>
//!     <Label value="Negative"/>
//!   </Labels>
//!   <Text name="article" value="$text"/>
//! </View>
//! "#;
//!
//! let session = SessionBuilder::new(config).build()?;
//! session.mark_object_loaded("article");
//!
//! // Click "Positive", then highlight a span on the text.
//! let labels = session.find_active_controller("sentiment").unwrap();
//! let labels = tag_cast::<LabelsTag>(labels.as_ref()).unwrap();
//! for child in session.bus().connections(labels)? {
//!     if let Some(label) = tag_cast::<LabelTag>(child.as_ref()) {
//!         if label.value() == "Positive" {
//!             label.click(session.bus())?;
//!         }
//!     }
//! }
//! assert_eq!(labels.selected_labels(), vec!["Positive"]);
//! # Ok::<(), horizon_annotate::AnnotateError>(())
//! ```

pub mod comms;
mod error;
pub mod regions;
mod result;
mod sdk;
mod session;
pub mod tags;
mod view;

pub mod prelude;

pub use comms::{BusError, BusResult, CommunicationBus, ControllerId};
pub use error::{AnnotateError, Result};
pub use regions::{
    RegionController, RegionError, RegionStyle, RegionValue, RegionsController, ResultAtom,
};
pub use result::{Origin, RawResult};
pub use sdk::{Annotation, Sdk};
pub use session::{Session, SessionBuilder};
pub use tags::{tag_cast, ControllerRegistry, LifecycleStage, TagBase, TagController};
pub use view::{RenderNode, ViewContext, ViewFn, ViewRegistry};

// Re-export the configuration layer that appears in this crate's API.
pub use horizon_annotate_config as config;
