//! Checkout Navigation Demo
//!
//! Runs a scripted checkout against in-memory collaborators and prints the
//! navigation debug snapshot. Useful as a smoke check of a config file.
//!
//! Usage:
//!   cargo run --features cli --bin checkout_nav_demo -- --scenario happy
//!   cargo run --features cli --bin checkout_nav_demo -- --scenario no-host --json
//!   cargo run --features cli --bin checkout_nav_demo -- --config nav.yaml --scenario skip-summary
//!
//! Scenarios:
//!   happy         host registered, every screen in order
//!   no-host       host never registered; emergency routing preserves the order
//!   broken-host   host transitions fail; the fallback loader takes over
//!   skip-summary  jumps from order summary to payment without validating it

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use tracing::info;

use checkout_nav::collaborators::{
    AcceptsPayload, ContainerHandle, ContentRegion, EmergencyRouter, LoadedView, OrderDataService,
    ScreenController, ScreenHost, ViewLoader, ViewNode,
};
use checkout_nav::error::{
    HostError, InjectionError, OrderDataError, RoutingError, TransitionError, ViewLoadError,
};
use checkout_nav::events::MemorySink;
use checkout_nav::{CheckoutContext, NavigationConfig, NavigationOutcome};
use checkout_types::{screens, DeliveryInfo, Order, OrderItem, ScreenId, ValidationOutcome, ValidationStep};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Scenario {
    Happy,
    NoHost,
    BrokenHost,
    SkipSummary,
}

/// Scripted checkout run against in-memory collaborators
#[derive(Parser, Debug)]
#[command(name = "checkout_nav_demo")]
#[command(about = "Drive the checkout navigation layer through a scripted run")]
struct Args {
    /// Scenario to run
    #[arg(long, short = 's', value_enum, default_value = "happy")]
    scenario: Scenario,

    /// YAML config file (defaults apply to missing keys)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Host wait timeout override in milliseconds
    #[arg(long, env = "CHECKOUT_NAV_HOST_WAIT_MS")]
    host_wait_ms: Option<u64>,

    /// Print the snapshot as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Print every recorded navigation event
    #[arg(long, short = 'v')]
    verbose: bool,
}

// =============================================================================
// IN-MEMORY COLLABORATORS
// =============================================================================

/// Controller that just remembers the last order it received.
#[derive(Default)]
struct CheckoutScreen {
    last_order: Mutex<Option<String>>,
}

impl AcceptsPayload<Order> for CheckoutScreen {
    fn accept_payload(&self, payload: &Order) -> Result<(), InjectionError> {
        *self.last_order.lock().unwrap_or_else(|e| e.into_inner()) = Some(payload.id.clone());
        Ok(())
    }
}

fn controller_for(screen: &ScreenId) -> ScreenController {
    match screen.as_str() {
        screens::HOME | screens::PAYMENT_COMPLETE => ScreenController::Passive {
            screen: screen.clone(),
        },
        _ => ScreenController::Checkout {
            screen: screen.clone(),
            handler: Arc::new(CheckoutScreen::default()),
        },
    }
}

struct Window;

impl ContentRegion for Window {
    fn replace_content(&self, root: ViewNode) -> Result<(), HostError> {
        info!(screen = %root.screen, node = %root.node_id, "Content replaced");
        Ok(())
    }
}

struct DemoHost {
    broken: bool,
}

impl ScreenHost for DemoHost {
    fn transition_to(&self, screen: &ScreenId) -> Result<ScreenController, TransitionError> {
        if self.broken {
            return Err(HostError::Rejected {
                message: "scene graph locked".to_string(),
            }
            .into());
        }
        Ok(controller_for(screen))
    }

    fn set_content(&self, root: ViewNode) -> Result<(), HostError> {
        Window.replace_content(root)
    }

    fn set_title(&self, title: &str) {
        info!(title, "Window title set");
    }

    fn content_region(&self) -> Option<Arc<dyn ContentRegion>> {
        Some(Arc::new(Window))
    }

    fn outer_container(&self) -> Option<ContainerHandle> {
        Some(ContainerHandle {
            id: "main-window".to_string(),
        })
    }
}

struct DemoLoader;

impl ViewLoader for DemoLoader {
    fn load_view(&self, screen: &ScreenId) -> Result<LoadedView, ViewLoadError> {
        if screens::default_title(screen.as_str()).is_none() {
            return Err(ViewLoadError::ViewNotFound {
                screen: screen.to_string(),
            });
        }
        Ok(LoadedView {
            controller: controller_for(screen),
            root: ViewNode::new(screen.clone(), format!("{screen}-root")),
        })
    }
}

struct DemoRouter;

impl EmergencyRouter for DemoRouter {
    fn route_to(&self, screen: &ScreenId, order_id: Option<&str>) -> Result<(), RoutingError> {
        info!(%screen, order_id = order_id.unwrap_or("-"), "Emergency route");
        Ok(())
    }
}

struct DemoOrders {
    order: Order,
}

impl OrderDataService for DemoOrders {
    fn load_complete_order(&self, order_id: &str) -> Result<Order, OrderDataError> {
        if order_id == self.order.id {
            Ok(self.order.clone())
        } else {
            Err(OrderDataError::NotFound {
                order_id: order_id.to_string(),
            })
        }
    }
}

fn demo_order() -> Order {
    Order::new("DEMO-1001")
        .with_item(OrderItem::new("tea-01", "Oolong Tea", 2, Decimal::new(1250, 2)))
        .with_item(OrderItem::new("mug-02", "Stoneware Mug", 1, Decimal::new(1800, 2)))
        .with_delivery(DeliveryInfo {
            recipient_name: "Sam Taylor".to_string(),
            phone: "+44 20 7946 0000".to_string(),
            address: "221B Baker Street".to_string(),
            city: "London".to_string(),
            instructions: Some("Leave with concierge".to_string()),
            rush: false,
        })
}

// =============================================================================
// RUN
// =============================================================================

fn report(step: &str, outcome: &NavigationOutcome) {
    println!(
        "{step:<28} {:<18} via {:<9} {}",
        outcome.result.as_str(),
        outcome.strategy.map(|s| s.as_str()).unwrap_or("-"),
        outcome.message
    );
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => NavigationConfig::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => NavigationConfig::default(),
    };
    config = config.with_env_overrides()?;
    if let Some(ms) = args.host_wait_ms {
        config.host.wait_timeout_ms = ms;
    }
    if args.scenario == Scenario::NoHost {
        config.host.wait_timeout_ms = config.host.wait_timeout_ms.min(50);
    }

    let order = demo_order();
    let sink = Arc::new(MemorySink::default());
    let ctx = CheckoutContext::builder(config)
        .view_loader(Arc::new(DemoLoader))
        .emergency_router(Arc::new(DemoRouter))
        .order_service(Arc::new(DemoOrders {
            order: order.clone(),
        }))
        .event_sink(sink.clone())
        .without_background_tasks()
        .build()
        .context("building navigation context")?;

    let host: Arc<dyn ScreenHost> = Arc::new(DemoHost {
        broken: args.scenario == Scenario::BrokenHost,
    });
    if args.scenario != Scenario::NoHost {
        ctx.registry().set_host(&host)?;
    }

    let nav = ctx.navigator();
    let tracker = ctx.tracker();
    println!("Scenario: {:?}\n", args.scenario);

    let outcome = nav.navigate_to(screens::CART, Some(order.clone()), None);
    report("cart", &outcome);

    let outcome = nav.navigate_to(
        screens::DELIVERY_INFO,
        Some(order.clone()),
        Some(ScreenId::from(screens::CART)),
    );
    report("delivery_info", &outcome);
    tracker.record(
        &order.id,
        ValidationStep::DeliveryInfo,
        ValidationOutcome::Passed,
        "delivery form complete",
    );

    let outcome = nav.navigate_to(
        screens::ORDER_SUMMARY,
        Some(order.clone()),
        Some(ScreenId::from(screens::DELIVERY_INFO)),
    );
    report("order_summary", &outcome);
    if args.scenario != Scenario::SkipSummary {
        tracker.record(
            &order.id,
            ValidationStep::OrderSummary,
            ValidationOutcome::Passed,
            "summary confirmed",
        );
    }

    let outcome = nav.navigate_to(
        screens::PAYMENT_METHOD,
        Some(order.clone()),
        Some(ScreenId::from(screens::ORDER_SUMMARY)),
    );
    report("payment_method", &outcome);
    if outcome.can_resume() {
        if let Some(sid) = &outcome.session_id {
            let recovery = nav.recover_data(sid);
            println!(
                "{:<28} recovered={} source={:?}",
                "  resume", recovery.success, recovery.source
            );
        }
    }

    let summary = tracker.summarize_for_payment(&order);
    println!(
        "\nReady for payment: {} (errors: {}, warnings: {})",
        summary.is_ready_for_payment(),
        summary.errors.len(),
        summary.warnings.len()
    );
    for warning in &summary.warnings {
        println!("  warning: {warning}");
    }

    if let Some(outcome) = nav.go_back() {
        report("back", &outcome);
    }

    ctx.drain_events();
    println!();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&nav.debug_snapshot())?);
    } else {
        print!("{}", nav.get_debug_snapshot());
    }

    if args.verbose {
        println!("\nEvents:");
        for event in sink.events() {
            println!("  {}", serde_json::to_string(&event)?);
        }
    }

    ctx.shutdown();
    Ok(())
}
