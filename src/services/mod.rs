pub mod availability;
pub mod calendar;
pub mod lifecycle;
pub mod scheduler;
pub mod slots;
pub mod wizard;
