pub mod observations;
pub mod resources;
pub mod tidy;
