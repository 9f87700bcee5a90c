// Domain layer - Core types and the retention policy

pub mod model;
pub mod rules;
