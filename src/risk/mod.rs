pub mod level;
pub mod var;
