pub mod frame_state;
pub mod lighting;
pub mod transform;

pub use frame_state::{orbit_positions, FrameState};
pub use lighting::SceneLights;
pub use transform::{normal_matrix, ModelTransform, TransformOrder};
