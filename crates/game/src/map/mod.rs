mod objects;
mod testing_ground;

pub use objects::{MapObject, MapObjectKind};
pub use testing_ground::TestingGround;
