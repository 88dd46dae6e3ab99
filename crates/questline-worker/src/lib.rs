// Background notification scheduler.

mod scheduler;

pub use scheduler::{NotificationScheduler, SchedulerStore};
