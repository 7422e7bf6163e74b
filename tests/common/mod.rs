//! Shared test fixtures: an in-memory world with a scripted gateway and a
//! recording notifier.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;
use rust_decimal::Decimal;
use uuid::Uuid;

use keyvend::billing::{ChargeGateway, ChargeRequest, CreatedCharge};
use keyvend::notify::Notifier;
use keyvend::reconcile::ReconcileEngine;
use keyvend::reservation::ReservationManager;
use keyvend::store::memory::MemStore;
use keyvend::store::Store;
use keyvend::AppState;

// ── Scripted gateway ─────────────────────────────────────────

enum StatusScript {
    Report(String),
    Fail,
}

/// Hands out sequential gateway references and reports whatever status the
/// test programs per reference (default: still pending).
#[derive(Default)]
pub struct ScriptedGateway {
    counter: AtomicUsize,
    fail_create: AtomicBool,
    statuses: Mutex<HashMap<String, StatusScript>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_creates(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn report(&self, gateway_ref: &str, status: &str) {
        self.statuses.lock().unwrap().insert(
            gateway_ref.to_string(),
            StatusScript::Report(status.to_string()),
        );
    }

    pub fn fail_status(&self, gateway_ref: &str) {
        self.statuses
            .lock()
            .unwrap()
            .insert(gateway_ref.to_string(), StatusScript::Fail);
    }
}

#[async_trait]
impl ChargeGateway for ScriptedGateway {
    async fn create_charge(&self, _req: &ChargeRequest) -> anyhow::Result<CreatedCharge> {
        if self.fail_create.load(Ordering::SeqCst) {
            anyhow::bail!("gateway down");
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let gateway_ref = format!("yk-{:04}", n);
        Ok(CreatedCharge {
            payment_url: format!("https://pay.test/{}", gateway_ref),
            gateway_ref,
        })
    }

    async fn charge_status(&self, gateway_ref: &str) -> anyhow::Result<String> {
        match self.statuses.lock().unwrap().get(gateway_ref) {
            Some(StatusScript::Report(status)) => Ok(status.clone()),
            Some(StatusScript::Fail) => anyhow::bail!("status endpoint down"),
            None => Ok("pending".to_string()),
        }
    }
}

// ── Recording notifier ───────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(i64, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn for_requester(&self, requester_id: i64) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == requester_id)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, requester_id: i64, text: &str) -> anyhow::Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((requester_id, text.to_string()));
        Ok(())
    }
}

// ── World ────────────────────────────────────────────────────

pub struct World {
    pub store: Arc<MemStore>,
    pub gateway: Arc<ScriptedGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub manager: Arc<ReservationManager>,
    pub engine: Arc<ReconcileEngine>,
    hold: Duration,
}

/// Build a world over the in-memory store. `hold` is the reservation
/// window, `stale_after` the sweep staleness threshold.
pub fn world(hold: Duration, stale_after: Duration) -> World {
    let store = Arc::new(MemStore::new());
    let gateway = Arc::new(ScriptedGateway::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let store_dyn: Arc<dyn Store> = store.clone();
    let gateway_dyn: Arc<dyn ChargeGateway> = gateway.clone();
    let notifier_dyn: Arc<dyn Notifier> = notifier.clone();

    let manager = Arc::new(ReservationManager::new(
        store_dyn.clone(),
        gateway_dyn.clone(),
        hold,
    ));
    let engine = Arc::new(ReconcileEngine::new(
        store_dyn,
        gateway_dyn,
        notifier_dyn,
        stale_after,
        hold,
    ));

    World {
        store,
        gateway,
        notifier,
        manager,
        engine,
        hold,
    }
}

impl World {
    /// Five-minute hold, three-minute staleness: the production defaults.
    pub fn default_windows() -> World {
        world(Duration::minutes(5), Duration::minutes(3))
    }

    pub async fn seed_location(&self, base_rate: Decimal) -> Uuid {
        self.store
            .insert_location(&keyvend::models::NewLocation {
                name: format!("loc-{}", Uuid::new_v4().simple()),
                endpoint: format!("{}.vpn.test", Uuid::new_v4().simple()),
                base_rate,
            })
            .await
            .unwrap()
            .id
    }

    pub async fn seed_key(&self, location_id: Uuid) -> Uuid {
        self.store
            .insert_credential(location_id, &format!("vless://{}", Uuid::new_v4()))
            .await
            .unwrap()
    }

    /// Wrap the world into application state for router-level tests.
    pub fn app_state(&self) -> Arc<AppState> {
        let store_dyn: Arc<dyn Store> = self.store.clone();
        let gateway_dyn: Arc<dyn ChargeGateway> = self.gateway.clone();
        Arc::new(AppState {
            store: store_dyn.clone(),
            reservations: ReservationManager::new(store_dyn, gateway_dyn, self.hold),
            engine: self.engine.clone(),
        })
    }
}
