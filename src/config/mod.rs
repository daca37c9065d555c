pub mod calendar;

pub use calendar::CalendarConfig;
