pub mod daily_stat;
pub mod mutation;
pub mod time_event;

pub use daily_stat::DailyStat;
pub use mutation::{Method, OfflineMutation};
pub use time_event::{EventKind, TimeEvent};
