pub mod camera;
pub mod memory;
pub mod persistence;
