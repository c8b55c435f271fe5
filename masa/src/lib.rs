//! Masa: QR menus and waiter calls for restaurants.
//!
//! Guests scan a table's QR code, browse the menu and call a waiter; staff
//! see the calls live on the dashboard and work through them. This crate
//! wires the HTTP surface over the `masa-*` libraries.

pub mod app;
pub mod config;
pub mod controllers;
pub mod mailer;
pub mod realtime;
pub mod services;
pub mod state;

pub use app::{router, serve};
pub use config::AppConfig;
pub use mailer::{LogMailer, ResetMailer};
pub use state::AppState;
