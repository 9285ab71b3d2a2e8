pub mod diff;
pub mod hash;
pub mod version;
