pub mod contract;
pub mod health;
pub mod proposal;
pub mod root;
pub mod session;
pub mod verify;
pub mod voice;
