pub mod handle;
pub mod registry;
