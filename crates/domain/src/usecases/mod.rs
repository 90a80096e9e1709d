//! Application use cases / business logic

pub mod render;
pub mod session;

pub use render::{RenderConfig, Renderer};
pub use session::{
    DEFAULT_HISTORY_CAPACITY, SessionConfig, SessionController, SessionState, SkipReason,
    SubmitOutcome,
};
