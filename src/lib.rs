//! Filter-based photo editing core: stage model, filter catalog, render
//! session, bounded undo history and the busy-gated edit controller.

pub mod catalog;
pub mod config;
pub mod controller;
pub mod crop;
pub mod error;
pub mod export;
pub mod history;
pub mod picker;
pub mod previews;
pub mod processing;
pub mod script;
pub mod session;
pub mod stage;

pub use catalog::{FilterChain, FilterId, chain_for};
pub use controller::{Completion, EditController, Operation, Outcome, Ticket};
pub use error::EditError;
pub use history::EditHistory;
pub use processing::{CpuEngine, RenderEngine};
pub use session::{Adjustments, FlipAxis, RenderSession};
pub use stage::{AdjustmentStage, Mat4};
