//! Guarded company deletion
//!
//! ```text
//! Idle ──delete──> DependenciesChecked ──(no deps | proceed)──> FinalConfirmationPending
//!   ^                                                                  │ ack + confirm
//!   └────────────── dismiss (any stage) / finished <── Executing <─────┘
//! ```

pub mod guard;
pub mod prompt;

pub use guard::{DeleteStage, DeletionEvent, DeletionGuard, Effect};
pub use prompt::{ConfirmationSummary, DeletionPrompt};
