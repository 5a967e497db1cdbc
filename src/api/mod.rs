pub mod audit;
pub mod models;
