//! Shared in-memory collaborators for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;

use checkout_nav::clock::ManualClock;
use checkout_nav::collaborators::{
    AcceptsPayload, ContainerHandle, ContentRegion, EmergencyRouter, LoadedView, OrderDataService,
    ScreenController, ScreenHost, ViewLoader, ViewNode,
};
use checkout_nav::config::{EventConfig, NavigationConfig};
use checkout_nav::error::{
    HostError, InjectionError, OrderDataError, RoutingError, TransitionError, ViewLoadError,
};
use checkout_nav::events::MemorySink;
use checkout_nav::CheckoutContext;
use checkout_types::{DeliveryInfo, Order, OrderItem, ScreenId};

// =============================================================================
// CONTROLLERS
// =============================================================================

#[derive(Default)]
pub struct RecordingController {
    pub received: Mutex<Vec<String>>,
}

impl AcceptsPayload<Order> for RecordingController {
    fn accept_payload(&self, payload: &Order) -> Result<(), InjectionError> {
        self.received.lock().unwrap().push(payload.id.clone());
        Ok(())
    }
}

// =============================================================================
// HOST
// =============================================================================

#[derive(Default)]
pub struct FakeRegion {
    pub shown: Mutex<Vec<ScreenId>>,
}

impl ContentRegion for FakeRegion {
    fn replace_content(&self, root: ViewNode) -> Result<(), HostError> {
        self.shown.lock().unwrap().push(root.screen);
        Ok(())
    }
}

pub struct FakeHost {
    pub region: Arc<FakeRegion>,
    pub controller: Arc<RecordingController>,
    pub fail_transitions: AtomicBool,
    pub passive: AtomicBool,
    pub transitions: Mutex<Vec<ScreenId>>,
    pub titles: Mutex<Vec<String>>,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            region: Arc::new(FakeRegion::default()),
            controller: Arc::new(RecordingController::default()),
            fail_transitions: AtomicBool::new(false),
            passive: AtomicBool::new(false),
            transitions: Mutex::new(Vec::new()),
            titles: Mutex::new(Vec::new()),
        })
    }

    pub fn as_host(self: &Arc<Self>) -> Arc<dyn ScreenHost> {
        self.clone()
    }
}

impl ScreenHost for FakeHost {
    fn transition_to(&self, screen: &ScreenId) -> Result<ScreenController, TransitionError> {
        if self.fail_transitions.load(Ordering::SeqCst) {
            return Err(HostError::Rejected {
                message: "transition refused".to_string(),
            }
            .into());
        }
        self.transitions.lock().unwrap().push(screen.clone());
        if self.passive.load(Ordering::SeqCst) {
            return Ok(ScreenController::Passive {
                screen: screen.clone(),
            });
        }
        Ok(ScreenController::Checkout {
            screen: screen.clone(),
            handler: self.controller.clone(),
        })
    }

    fn set_content(&self, root: ViewNode) -> Result<(), HostError> {
        self.region.replace_content(root)
    }

    fn set_title(&self, title: &str) {
        self.titles.lock().unwrap().push(title.to_string());
    }

    fn content_region(&self) -> Option<Arc<dyn ContentRegion>> {
        Some(self.region.clone())
    }

    fn outer_container(&self) -> Option<ContainerHandle> {
        Some(ContainerHandle {
            id: "window".to_string(),
        })
    }
}

// =============================================================================
// LOADER / ROUTER / ORDERS
// =============================================================================

#[derive(Default)]
pub struct FakeLoader {
    pub loads: AtomicUsize,
    pub fail: AtomicBool,
}

impl ViewLoader for FakeLoader {
    fn load_view(&self, screen: &ScreenId) -> Result<LoadedView, ViewLoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ViewLoadError::LoadError {
                screen: screen.to_string(),
                message: "corrupt layout".to_string(),
            });
        }
        Ok(LoadedView {
            controller: ScreenController::Checkout {
                screen: screen.clone(),
                handler: Arc::new(RecordingController::default()),
            },
            root: ViewNode::new(screen.clone(), "root"),
        })
    }
}

#[derive(Default)]
pub struct FakeRouter {
    pub routes: Mutex<Vec<(ScreenId, Option<String>)>>,
    pub fail: AtomicBool,
}

impl FakeRouter {
    pub fn failing() -> Arc<Self> {
        let router = Self::default();
        router.fail.store(true, Ordering::SeqCst);
        Arc::new(router)
    }

    pub fn route_count(&self) -> usize {
        self.routes.lock().unwrap().len()
    }
}

impl EmergencyRouter for FakeRouter {
    fn route_to(&self, screen: &ScreenId, order_id: Option<&str>) -> Result<(), RoutingError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RoutingError::NoRoute {
                screen: screen.to_string(),
            });
        }
        self.routes
            .lock()
            .unwrap()
            .push((screen.clone(), order_id.map(str::to_string)));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeOrders {
    pub orders: Mutex<Vec<Order>>,
}

impl FakeOrders {
    pub fn with(order: Order) -> Arc<Self> {
        Arc::new(Self {
            orders: Mutex::new(vec![order]),
        })
    }
}

impl OrderDataService for FakeOrders {
    fn load_complete_order(&self, order_id: &str) -> Result<Order, OrderDataError> {
        self.orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == order_id)
            .cloned()
            .ok_or_else(|| OrderDataError::NotFound {
                order_id: order_id.to_string(),
            })
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

pub fn delivery() -> DeliveryInfo {
    DeliveryInfo {
        recipient_name: "Alex Kim".to_string(),
        phone: "555-0100".to_string(),
        address: "1 Main St".to_string(),
        city: "Springfield".to_string(),
        instructions: None,
        rush: false,
    }
}

/// Order with items and delivery info.
pub fn order_o1() -> Order {
    Order::new("O1")
        .with_item(OrderItem::new("sku-1", "Green Tea", 2, Decimal::new(450, 2)))
        .with_delivery(delivery())
}

/// Test config: no host wait, events on, background tasks off.
pub fn test_config() -> NavigationConfig {
    let mut config = NavigationConfig::default();
    config.host.wait_timeout_ms = 0;
    config.events = EventConfig::default();
    config
}

pub struct Harness {
    pub ctx: CheckoutContext,
    pub clock: Arc<ManualClock>,
    pub loader: Arc<FakeLoader>,
    pub router: Arc<FakeRouter>,
    pub sink: Arc<MemorySink>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_router(test_config(), Arc::new(FakeRouter::default()))
    }

    pub fn with_router(config: NavigationConfig, router: Arc<FakeRouter>) -> Self {
        let clock = Arc::new(ManualClock::starting_now());
        let loader = Arc::new(FakeLoader::default());
        let sink = Arc::new(MemorySink::default());
        let ctx = CheckoutContext::builder(config)
            .clock(clock.clone())
            .view_loader(loader.clone())
            .emergency_router(router.clone())
            .order_service(FakeOrders::with(order_o1()))
            .event_sink(sink.clone())
            .without_background_tasks()
            .build()
            .expect("context builds");
        Self {
            ctx,
            clock,
            loader,
            router,
            sink,
        }
    }

    /// Register `host`; the returned Arc must be kept alive by the test.
    pub fn register(&self, host: &Arc<FakeHost>) {
        self.ctx.registry().set_host(&host.as_host()).expect("host registers");
    }
}
