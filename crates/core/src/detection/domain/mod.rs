pub mod backend;
pub mod detection;
