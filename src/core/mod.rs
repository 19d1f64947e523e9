pub mod buckets;
pub mod dashboard;
pub mod recompute;
pub mod replay;
