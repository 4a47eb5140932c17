//! Managed side of the capture pipeline
//!
//! The state machine that consumes native events, the owner-thread
//! dispatcher that serialises texture mutation, and the orientation rules
//! applied to every presented image.

pub mod bridge;
pub mod dispatcher;
pub mod events;
pub mod guard;
pub mod machine;
pub mod orientation;
pub mod runner;
pub mod stats;
pub mod texture;

pub use bridge::CameraBridge;
pub use dispatcher::{DispatchQueue, MainThreadDispatcher};
pub use events::CaptureEvent;
pub use guard::{CaptureGuard, CaptureState};
pub use machine::CaptureStateMachine;
pub use orientation::{derive_transform, DeviceOrientation, OrientationTransform};
pub use runner::PipelineRunner;
pub use stats::{AtomicPipelineStats, PipelineStats};
pub use texture::{
    InMemoryTextureStore, SlotTexture, StoredTexture, TextureHandle, TextureSet, TextureSlot,
    TextureStore,
};
