//! Meal-count feed for the event staffing service
//!
//! Scanning stations publish `MEAL_SCANNED` messages into a per-event room
//! and every connected dashboard receives the updated count.

mod client;
mod error;
mod message;

pub use client::{ConnectionState, MealUpdatesClient, MealUpdatesOptions, DEFAULT_MEAL_UPDATES_URL};
pub use error::RealtimeError;
pub use message::{ClientMessage, ClientType, MealScan, ServerMessage};
