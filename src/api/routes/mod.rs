pub mod alerts;
pub mod health;
pub mod resources;
pub mod stats;
