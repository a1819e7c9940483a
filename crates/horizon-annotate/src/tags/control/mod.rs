//! Control tags: the things that select and label.

mod choices;
mod label;
mod labels;
mod textarea;

pub use choices::{ChoiceTag, ChoicesTag};
pub use label::LabelTag;
pub use labels::LabelsTag;
pub use textarea::TextAreaTag;

/// Event emitted by a label when clicked.
pub const EVENT_LABEL_SELECTED: &str = "label-selected";
/// Event re-emitted by a labels group after its selection changed.
pub const EVENT_LABELS_SELECTION_CHANGED: &str = "labels-selection-changed";
/// Event emitted by a choice when clicked.
pub const EVENT_CHOICE_SELECTED: &str = "choice-selected";
/// Event re-emitted by a choices group after its selection changed.
pub const EVENT_CHOICES_SELECTION_CHANGED: &str = "choices-selection-changed";
