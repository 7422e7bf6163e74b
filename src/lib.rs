//! keyvend — key vending service with payment reconciliation.
//!
//! Sells time-limited access keys: a purchase holds one free key for five
//! minutes while the payment gateway collects the money, and the
//! reconciliation engine converges every charge to exactly one terminal
//! outcome through a gateway push, a periodic sweep, or both.

use std::sync::Arc;

pub mod api;
pub mod billing;
pub mod cli;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod models;
pub mod notify;
pub mod pricing;
pub mod reconcile;
pub mod reservation;
pub mod store;

use reconcile::ReconcileEngine;
use reservation::ReservationManager;
use store::Store;

/// Shared application state passed to handlers.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub reservations: ReservationManager,
    pub engine: Arc<ReconcileEngine>,
}
