pub mod systems;
pub mod transform;
pub mod types;
pub mod world;

pub use systems::look_rotation;
pub use types::*;
pub use world::StageWorld;
