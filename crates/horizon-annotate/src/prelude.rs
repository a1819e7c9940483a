//! Convenience re-exports for embedding applications.

pub use crate::comms::{BusError, CommunicationBus};
pub use crate::error::{AnnotateError, Result};
pub use crate::regions::{RegionController, RegionValue, RegionsController};
pub use crate::result::{Origin, RawResult};
pub use crate::sdk::{Annotation, Sdk};
pub use crate::session::{Session, SessionBuilder};
pub use crate::tags::{tag_cast, ControllerRegistry, TagController};
pub use crate::view::{RenderNode, ViewRegistry};

pub use horizon_annotate_config::{
    AttrValue, AttributeDescriptor, AttributeSchema, ConfigTree, ConfigTreeNode, TagKind, TagSet,
};
pub use horizon_annotate_core::{Events, ReadyLatch, StateHandle, Store};
