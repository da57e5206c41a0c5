pub mod health;
pub mod verify;

pub use verify::VerifyState;
