//! Domain types for PageForge
//!
//! Product input, the section plan, generated slices, pipeline stages and the
//! chat log. Everything here is plain data plus the invariants that travel
//! with it; the actors and pipelines that move it around live elsewhere.

mod chat;
mod product;
mod section;
mod slice;
mod stage;

pub use chat::{CHAT_HISTORY_WINDOW, ChatMessage, ChatRole, history_window};
pub use product::{ImageData, ProductData};
pub use section::{DesignPlan, SectionDescriptor, SectionType};
pub use slice::{GeneratedSlice, SliceCollection, SliceField, SlicePatch};
pub use stage::{PROGRESS_STEPS, PipelineStage, StepStatus};
