pub mod health;
pub mod satellites;
pub mod stats;
