mod barrel;

pub use barrel::{BarrelConfig, Detonation, ExplosiveBarrel, HazardPhase};
