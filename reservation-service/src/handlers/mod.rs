//! HTTP handlers for reservation-service.

pub mod clients;
pub mod invoices;
pub mod movements;
pub mod reports;
pub mod reservations;
pub mod rooms;
pub mod users;
