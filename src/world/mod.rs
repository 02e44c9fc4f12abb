pub mod physics;
pub mod registry;
pub mod setup;
pub mod sync;

pub use physics::{BodyDesc, BodyHandle, BodyShape, PhysicsWorld};
pub use registry::{ModelId, ObjectId, Pairing, VisualDesc, VisualKind, VisualObject, VisualObjectRegistry};
pub use sync::{LoopState, SimulationContext, TickOutcome};

#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("Invalid body description: {reason}")]
    InvalidBody { reason: String },
    #[error("Unknown body {handle:?}")]
    UnknownBody { handle: BodyHandle },
    #[error("Body {handle:?} is static and cannot be moved")]
    StaticBody { handle: BodyHandle },
    #[error("Unknown object {id}")]
    UnknownObject { id: ObjectId },
    #[error("Body {handle:?} is already paired with {object}")]
    BodyAlreadyPaired { handle: BodyHandle, object: ObjectId },
}

pub type WorldResult<T> = Result<T, WorldError>;
