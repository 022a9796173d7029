//! Checkout navigation - screen transitions for the storefront checkout wizard
//!
//! Moves the user between checkout screens (cart, delivery info, order
//! summary, payment) while keeping the in-flight order safe when the screen
//! host misbehaves.
//!
//! ## Architecture
//!
//! ```text
//! screen controller
//!        │ navigate_to(target, order, source)
//!        ▼
//! NavigationOrchestrator ──▶ SessionStore        (preserve payload)
//!        │               ──▶ HistoryStack        (back navigation)
//!        │               ──▶ ValidationTracker   (bypass detection)
//!        ▼
//! primary ─▶ fallback ─▶ emergency strategies
//!    │           │            │
//! HostRegistry  ViewLoader   EmergencyRouter
//! ```
//!
//! Everything is built once by [`CheckoutContext`] and shared by `Arc`;
//! there are no process-wide singletons.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use checkout_nav::{CheckoutContext, NavigationConfig};
//! use checkout_types::screens;
//!
//! let ctx = CheckoutContext::builder(NavigationConfig::default().with_env_overrides()?)
//!     .view_loader(loader)
//!     .emergency_router(router)
//!     .build()?;
//! ctx.registry().set_host(&host)?;
//!
//! let outcome = ctx.navigator().navigate_to(screens::ORDER_SUMMARY, Some(order), None);
//! if outcome.can_resume() {
//!     // show "your data is safe" with a resume action
//! }
//! ```

// Core error handling
pub mod error;

// Configuration and time
pub mod clock;
pub mod config;

// Interfaces implemented by the host application
pub mod collaborators;

// Stores
pub mod history;
pub mod host;
pub mod session;
pub mod validation;

// Orchestration
pub mod navigation;

// Ambient: events and background threads
pub mod background;
pub mod events;

// Application-lifetime wiring
pub mod context;

// Public re-exports
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use collaborators::{
    AcceptsPayload, ContainerHandle, ContentRegion, ControllerCapabilities, EmergencyRouter,
    LoadedView, OrderDataService, ScreenController, ScreenHost, ViewLoader, ViewNode,
};
pub use config::NavigationConfig;
pub use context::{CheckoutContext, CheckoutContextBuilder};
pub use error::{ContextError, NavigationError};
pub use history::{HistoryStack, NavigationContext};
pub use host::{HostRegistry, HostStatus};
pub use navigation::{NavigationOrchestrator, NavigationOutcome, NavigationResult, StrategyKind};
pub use session::{RecoveryResult, SessionStore};
pub use validation::{ValidationSummary, ValidationTracker};

pub use checkout_types;
