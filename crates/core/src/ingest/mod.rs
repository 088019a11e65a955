pub mod earnings;
pub mod fixture;
pub mod provider;
pub mod types;
