pub mod features;
pub mod market;
