//! Command handlers for the auth and home screens.
//!
//! Handlers validate input, call the API layer, update the session, move the
//! navigator and publish the outcome to the [`crate::notify::NotificationCenter`].

pub mod auth;
pub mod home;
