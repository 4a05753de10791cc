//! Core primitives for the location tracking engine
//!
//! This crate provides the topic-keyed event bus and the day-offset
//! timeline arithmetic shared by the data and map layers.

pub mod events;
pub mod timeline;

// Re-export commonly used types
pub use events::{EventBus, SubscriptionId};
pub use timeline::{date_label, day_floor, AvailableDateRange, DayRange, DAY_MILLIS};
