//! Error types for the annotation engine.

use crate::comms::BusError;
use crate::regions::RegionError;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, AnnotateError>;

/// The main error type for the annotation engine.
#[derive(Debug, thiserror::Error)]
pub enum AnnotateError {
    /// Configuration parsing or attribute validation failed.
    #[error(transparent)]
    Config(#[from] horizon_annotate_config::Error),

    /// A result payload failed hydration.
    #[error(transparent)]
    Region(#[from] RegionError),

    /// Communication bus misuse.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// Session store misuse.
    #[error(transparent)]
    Store(#[from] horizon_annotate_core::StoreError),

    /// A registered controller type has no view.
    #[error("No view registered for tag type '{0}'")]
    MissingView(String),

    /// A second view was defined for the same tag type.
    #[error("View for tag type '{0}' is already defined")]
    DuplicateView(String),

    /// A registered tag type has no controller factory.
    #[error("No controller factory registered for tag type '{0}'")]
    MissingController(String),

    /// A render was requested for an element without a configuration node.
    #[error("Element has no configuration node")]
    NodeNotFound,

    /// A result references a control tag absent from the configuration.
    #[error("Result references unknown control '{0}'")]
    UnknownFromName(String),

    /// A result references an object tag absent from the configuration.
    #[error("Result references unknown object '{0}'")]
    UnknownToName(String),

    /// A result carries a label missing from the control's taxonomy.
    #[error("Label '{label}' is not part of the taxonomy of control '{control}'")]
    UnknownLabel { label: String, control: String },
}
