mod engine;
mod template;

pub use engine::TeraEngine;
pub use template::{PromptTemplate, Slot, SlotValues};
