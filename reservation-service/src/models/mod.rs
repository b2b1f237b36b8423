//! Data models for reservation-service.

pub mod client;
pub mod invoice;
pub mod movement;
pub mod report;
pub mod reservation;
pub mod room;
pub mod user;

pub use client::{Client, CreateClient, UpdateClient};
pub use invoice::{
    CreateInvoice, CreatePayment, Invoice, InvoiceStatus, Payment, PaymentMethod,
};
pub use movement::{CreateMovement, Movement, MovementKind};
pub use report::{
    ActivityEntry, DashboardSnapshot, FinancialStatus, FinancialSummary, GuestRecord, Kpis,
    LedgerTotals, OccupancyRecord, PeriodDescriptor,
};
pub use reservation::{CreateReservation, Reservation, ReservationStatus, UpdateReservation};
pub use room::{CreateRoom, Room, RoomStatus, UpdateRoom};
pub use user::{CreateUser, LoginRequest, Role, UpdateUser, User};
