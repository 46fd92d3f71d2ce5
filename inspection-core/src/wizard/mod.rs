//! Multi-step inspection wizard: step table, validation, navigation and
//! autosave bookkeeping.

pub mod autosave;
pub mod controller;
pub mod steps;
pub mod validation;

pub use autosave::{Debouncer, SaveSequencer, SaveTicket};
pub use controller::{
    CompletionRequest, InspectionUpdate, JumpPolicy, PendingChanges, WizardConfig,
    WizardController, WizardError,
};
pub use steps::{StepCondition, StepId, WIZARD_STEPS, WizardStep, active_steps};
pub use validation::{FieldRule, StepValidation, validate_for_completion, validate_step};
