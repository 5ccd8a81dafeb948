pub mod module;
pub mod opcode;
pub mod payload;
pub mod primitive;
pub mod section;
pub mod types;
