pub mod autorotate;
pub mod directory;
pub mod dummy;
pub mod manifest;
pub mod rawcheck;
