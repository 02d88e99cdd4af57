// ============================
// crates/client-lib/src/controller.rs
// ============================
//! Session controller: the client-side state machine that ties the gateway,
//! the reconciler, the route resolver and the periodic push loop together.
//!
//! Idle -> Locating -> InSession. Teardown cancels the push loop
//! synchronously and invalidates in-flight route requests, so nothing calls
//! back into a torn-down context.

use crate::error::ClientError;
use crate::gateway::GatewayHandle;
use crate::geo::{LatLng, TransportMode};
use crate::position::{PositionSource, DEFAULT_POSITION};
use crate::push_loop::{PushLoopHandle, PUSH_INTERVAL};
use crate::reconciler::{Applied, Reconciler};
use crate::routing::{Route, RouteResolver, RouteSlot};
use convoy_common::{DestinationUpdated, ServerEvent, UserIdentity, DESTINATION_UPDATED};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Locating,
    InSession,
}

/// Typed events for the presentation layer; how they are rendered is not
/// this crate's concern.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Device position unavailable; coordinates fell back to the default
    UsingDefaultLocation,
    /// Someone joined or left the journey
    Presence(String),
    /// The leader moved the destination
    DestinationChanged { updated_by: String },
    /// The server rejected one of our actions
    ActionRejected(String),
}

pub struct SessionController {
    me: UserIdentity,
    phase: Phase,
    gateway: Arc<dyn GatewayHandle>,
    positions: Arc<dyn PositionSource>,
    resolver: Arc<RouteResolver>,
    reconciler: Reconciler,
    current_position: Option<LatLng>,
    push_loop: Option<PushLoopHandle>,
    route_shown: bool,
    selected: Option<Uuid>,
    my_route: RouteSlot,
    my_route_rx: watch::Receiver<Option<Route>>,
    selected_route: RouteSlot,
    selected_route_rx: watch::Receiver<Option<Route>>,
    notice_tx: mpsc::UnboundedSender<Notice>,
}

impl SessionController {
    pub fn new(
        me: UserIdentity,
        gateway: Arc<dyn GatewayHandle>,
        positions: Arc<dyn PositionSource>,
        resolver: Arc<RouteResolver>,
    ) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let (my_route, my_route_rx) = RouteSlot::new();
        let (selected_route, selected_route_rx) = RouteSlot::new();
        (
            Self {
                me,
                phase: Phase::Idle,
                gateway,
                positions,
                resolver,
                reconciler: Reconciler::new(TransportMode::default()),
                current_position: None,
                push_loop: None,
                route_shown: false,
                selected: None,
                my_route,
                my_route_rx,
                selected_route,
                selected_route_rx,
                notice_tx,
            },
            notice_rx,
        )
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn current_position(&self) -> Option<LatLng> {
        self.current_position
    }

    /// Watch the route from our own position to the destination
    pub fn my_route(&self) -> watch::Receiver<Option<Route>> {
        self.my_route_rx.clone()
    }

    /// Watch the route of the currently selected participant
    pub fn selected_route(&self) -> watch::Receiver<Option<Route>> {
        self.selected_route_rx.clone()
    }

    /// Idle -> Locating. Position failure is non-fatal: fall back to the
    /// default coordinate and tell the presentation layer.
    pub async fn locate(&mut self) {
        self.phase = Phase::Locating;
        match self.positions.current().await {
            Ok(point) => self.current_position = Some(point),
            Err(err) => {
                tracing::warn!(error = %err, "device position unavailable, using default");
                self.current_position = Some(DEFAULT_POSITION);
                let _ = self.notice_tx.send(Notice::UsingDefaultLocation);
            }
        }
    }

    /// Locating -> InSession: join the room and start the periodic push.
    pub async fn begin(&mut self, code: &str) -> Result<(), ClientError> {
        self.gateway.join_journey(code).await?;

        let push = PushLoopHandle::spawn(
            Arc::clone(&self.gateway),
            Arc::clone(&self.positions),
            code.to_string(),
            PUSH_INTERVAL,
        );
        if let Some(old) = self.push_loop.replace(push) {
            old.cancel();
        }

        self.phase = Phase::InSession;
        Ok(())
    }

    /// Fold one inbound event into local state and react to what changed.
    pub fn apply_event(&mut self, event: ServerEvent) {
        match self.reconciler.apply(event) {
            Applied::Joined => {
                if self.route_shown {
                    self.refresh_my_route();
                }
            }
            Applied::Track(user_id) => {
                if user_id == self.me.id {
                    if let Some(track) = self.reconciler.track(&user_id) {
                        self.current_position = Some(track.position);
                    }
                    if self.route_shown {
                        self.refresh_my_route();
                    }
                }
                if self.selected == Some(user_id) {
                    self.refresh_selected_route();
                }
            }
            Applied::DestinationChanged { updated_by, .. } => {
                let _ = self
                    .notice_tx
                    .send(Notice::DestinationChanged { updated_by });
                if self.route_shown {
                    self.refresh_my_route();
                }
                if self.selected.is_some() {
                    self.refresh_selected_route();
                }
            }
            Applied::Info(message) => {
                let _ = self.notice_tx.send(Notice::Presence(message));
            }
            Applied::ServerError(message) => {
                let _ = self.notice_tx.send(Notice::ActionRejected(message));
            }
            Applied::Nothing => {}
        }
    }

    /// Display the route from our position to the destination
    pub fn show_route(&mut self) {
        self.route_shown = true;
        self.refresh_my_route();
    }

    pub fn hide_route(&mut self) {
        self.route_shown = false;
        self.my_route.clear();
    }

    fn refresh_my_route(&self) {
        let (Some(origin), Some(destination)) =
            (self.current_position, self.reconciler.destination())
        else {
            return;
        };
        self.my_route
            .request(Arc::clone(&self.resolver), origin, destination);
    }

    /// Toggle display of one participant's route to the destination.
    /// Selecting the participant again clears it.
    pub fn select_participant(&mut self, user_id: Uuid) {
        if self.selected == Some(user_id) {
            self.selected = None;
            self.selected_route.clear();
            return;
        }
        self.selected = Some(user_id);
        self.refresh_selected_route();
    }

    fn refresh_selected_route(&self) {
        let Some(user_id) = self.selected else {
            return;
        };
        let (Some(track), Some(destination)) = (
            self.reconciler.track(&user_id),
            self.reconciler.destination(),
        ) else {
            return;
        };
        self.selected_route
            .request(Arc::clone(&self.resolver), track.position, destination);
    }

    /// Announce a destination change to the room. The durable update goes
    /// through the REST api first; local state follows from the room echo.
    pub async fn publish_destination(&self, destination: LatLng) -> Result<(), ClientError> {
        let code = self
            .reconciler
            .journey()
            .map(|journey| journey.code.clone())
            .ok_or_else(|| ClientError::Gateway("no active journey".to_string()))?;

        let payload = DestinationUpdated {
            destination: destination.to_point(),
            updated_by: self.me.username.clone(),
        };
        self.gateway
            .send_message(&code, DESTINATION_UPDATED, serde_json::to_value(payload)?)
            .await
    }

    /// Tear down: cancel the push loop, drop displayed routes, invalidate
    /// in-flight route requests. InSession -> Idle.
    pub fn shutdown(&mut self) {
        if let Some(push) = self.push_loop.take() {
            push.cancel();
        }
        self.my_route.clear();
        self.selected_route.clear();
        self.route_shown = false;
        self.selected = None;
        self.phase = Phase::Idle;
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(push) = self.push_loop.take() {
            push.cancel();
        }
    }
}
