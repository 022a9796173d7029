//! Interfaces to the host application.
//!
//! The navigation layer never renders anything itself. It drives these
//! traits, which the desktop application implements: the screen host, the
//! view loader, the order-data service and the emergency router.
//!
//! Screen controllers are exposed as a closed [`ScreenController`] union.
//! Payload injection dispatches on the variant and on the
//! [`AcceptsPayload`] capability, never on method names.

use checkout_types::{Order, ScreenId};
use std::fmt;
use std::sync::Arc;

use crate::error::{
    HostError, InjectionError, OrderDataError, RoutingError, TransitionError, ViewLoadError,
};

// =============================================================================
// VIEW NODES
// =============================================================================

/// Opaque handle to the root node of a loaded view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewNode {
    pub screen: ScreenId,
    pub node_id: String,
}

impl ViewNode {
    pub fn new(screen: ScreenId, node_id: impl Into<String>) -> Self {
        Self {
            screen,
            node_id: node_id.into(),
        }
    }
}

/// Handle to the host's outer window container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    pub id: String,
}

/// A loaded view: its controller plus the node to place into the host.
#[derive(Debug, Clone)]
pub struct LoadedView {
    pub controller: ScreenController,
    pub root: ViewNode,
}

// =============================================================================
// CONTROLLERS
// =============================================================================

/// Capability: the controller can take a payload of type `T`.
pub trait AcceptsPayload<T>: Send + Sync {
    fn accept_payload(&self, payload: &T) -> Result<(), InjectionError>;
}

/// Capability probe for controllers the navigation layer has no dedicated
/// variant for.
pub trait ControllerCapabilities: Send + Sync {
    fn screen(&self) -> ScreenId;

    /// `Some` when the controller accepts an order payload.
    fn order_acceptor(&self) -> Option<&dyn AcceptsPayload<Order>> {
        None
    }
}

/// Controller created for a newly shown screen.
#[derive(Clone)]
pub enum ScreenController {
    /// One of the checkout wizard screens; always takes the order.
    Checkout {
        screen: ScreenId,
        handler: Arc<dyn AcceptsPayload<Order>>,
    },
    /// Any other controller; probed for the order capability.
    Generic(Arc<dyn ControllerCapabilities>),
    /// Static screen with no data binding.
    Passive { screen: ScreenId },
}

impl ScreenController {
    pub fn screen(&self) -> ScreenId {
        match self {
            ScreenController::Checkout { screen, .. } => screen.clone(),
            ScreenController::Generic(caps) => caps.screen(),
            ScreenController::Passive { screen } => screen.clone(),
        }
    }

    /// Hand the order to the controller, if it can take one.
    pub fn inject_order(&self, order: &Order) -> Result<(), InjectionError> {
        match self {
            ScreenController::Checkout { handler, .. } => handler.accept_payload(order),
            ScreenController::Generic(caps) => match caps.order_acceptor() {
                Some(acceptor) => acceptor.accept_payload(order),
                None => Err(InjectionError::Unsupported {
                    screen: caps.screen().to_string(),
                }),
            },
            ScreenController::Passive { screen } => Err(InjectionError::Unsupported {
                screen: screen.to_string(),
            }),
        }
    }
}

impl fmt::Debug for ScreenController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenController::Checkout { screen, .. } => {
                f.debug_struct("Checkout").field("screen", screen).finish()
            }
            ScreenController::Generic(caps) => {
                f.debug_tuple("Generic").field(&caps.screen()).finish()
            }
            ScreenController::Passive { screen } => {
                f.debug_struct("Passive").field("screen", screen).finish()
            }
        }
    }
}

// =============================================================================
// HOST APPLICATION
// =============================================================================

/// The region of the host window that displays the current screen.
pub trait ContentRegion: Send + Sync {
    fn replace_content(&self, root: ViewNode) -> Result<(), HostError>;
}

/// The application object that swaps visible screen content.
///
/// Borrowed by the navigation layer: the registry only keeps a weak
/// reference, lifecycle belongs to the application.
pub trait ScreenHost: Send + Sync {
    /// The host's own transition: load `screen`, show it, return its controller.
    fn transition_to(&self, screen: &ScreenId) -> Result<ScreenController, TransitionError>;

    fn set_content(&self, root: ViewNode) -> Result<(), HostError>;

    fn set_title(&self, title: &str);

    fn content_region(&self) -> Option<Arc<dyn ContentRegion>>;

    fn outer_container(&self) -> Option<ContainerHandle>;
}

/// Loads views by screen id.
pub trait ViewLoader: Send + Sync {
    fn load_view(&self, screen: &ScreenId) -> Result<LoadedView, ViewLoadError>;
}

/// Source of truth for complete orders.
pub trait OrderDataService: Send + Sync {
    fn load_complete_order(&self, order_id: &str) -> Result<Order, OrderDataError>;
}

/// Host-independent, best-effort navigation.
pub trait EmergencyRouter: Send + Sync {
    fn route_to(&self, screen: &ScreenId, order_id: Option<&str>) -> Result<(), RoutingError>;
}
