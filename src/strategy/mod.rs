pub mod allocation;
pub mod implementations;
pub mod traits;
