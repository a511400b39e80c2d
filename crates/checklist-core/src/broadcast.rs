//! Fan-out of rendered views to every affected surface.

use async_trait::async_trait;
use checklist_models::{ScopeId, ScopeState};
use futures::future::join_all;
use tracing::{debug, warn};

use crate::error::DeliveryError;
use crate::permission::ScopeKind;
use crate::render::View;

/// Why a destination receives a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestinationRole {
    /// The chat the triggering event came from.
    Origin,
    /// The duty principal's private chat.
    Companion,
    /// The configured announcement chat.
    Announce,
}

/// One surface a view is pushed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    pub chat: ScopeId,
    pub role: DestinationRole,
}

impl Destination {
    pub fn new(chat: impl Into<ScopeId>, role: DestinationRole) -> Self {
        Self {
            chat: chat.into(),
            role,
        }
    }

    pub fn origin(chat: impl Into<ScopeId>) -> Self {
        Self::new(chat, DestinationRole::Origin)
    }
}

/// Sends one view to one destination.
#[async_trait]
pub trait Outbound: Send + Sync {
    async fn deliver(&self, destination: &Destination, view: &View) -> Result<(), DeliveryError>;
}

/// Result of a broadcast: each destination either received the view or failed.
#[derive(Debug, Default)]
pub struct BroadcastReport {
    pub delivered: Vec<Destination>,
    pub failed: Vec<(Destination, DeliveryError)>,
}

impl BroadcastReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Failed deliveries to companion chats.
    pub fn companion_failures(&self) -> impl Iterator<Item = &(Destination, DeliveryError)> {
        self.failed
            .iter()
            .filter(|(d, _)| d.role == DestinationRole::Companion)
    }
}

/// Delivers a view to each destination independently.
///
/// Deliveries run concurrently. A failure is logged and recorded in the
/// report; it never affects other destinations and never becomes an error.
pub async fn broadcast(
    outbound: &dyn Outbound,
    destinations: &[Destination],
    view: &View,
) -> BroadcastReport {
    let results = join_all(destinations.iter().map(|destination| async move {
        let result = outbound.deliver(destination, view).await;
        (destination.clone(), result)
    }))
    .await;

    let mut report = BroadcastReport::default();
    for (destination, result) in results {
        match result {
            Ok(()) => {
                debug!(chat_id = %destination.chat, role = ?destination.role, "Delivered");
                report.delivered.push(destination);
            }
            Err(e) => {
                warn!(chat_id = %destination.chat, role = ?destination.role, error = %e, "Delivery failed");
                report.failed.push((destination, e));
            }
        }
    }
    report
}

/// Destinations for an update of a scope.
///
/// Always the origin; for a group scope also the duty principal's private
/// chat; and the announcement chat when given. Duplicates are dropped.
pub fn destinations_for(
    scope: &ScopeId,
    state: &ScopeState,
    origin_kind: ScopeKind,
    announce: Option<&ScopeId>,
) -> Vec<Destination> {
    let mut out = vec![Destination::origin(scope.clone())];

    if origin_kind == ScopeKind::Group {
        if let Some(duty) = &state.duty {
            let companion = ScopeId::from(duty.principal.get().to_string());
            if &companion != scope {
                out.push(Destination::new(companion, DestinationRole::Companion));
            }
        }
    }

    if let Some(announce) = announce {
        if out.iter().all(|d| &d.chat != announce) {
            out.push(Destination::new(announce.clone(), DestinationRole::Announce));
        }
    }
    out
}
