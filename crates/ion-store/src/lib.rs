pub mod client;

pub mod categories;
pub mod reminders;
pub mod savings;
pub mod shopping;
pub mod todos;
pub mod transactions;
pub mod users;

pub use client::SupabaseClient;
