//! Checklist Core - state, dispatch, rendering and lifecycle for the checklist bot.
//!
//! This crate holds everything that does not talk to Telegram directly:
//!
//! - **book**: The state accessor; the only path by which the document is mutated
//! - **dispatch**: Maps normalized inbound events to state operations
//! - **permission**: Who may add and remove items
//! - **render**: Text views, control surfaces and callback data
//! - **broadcast**: Fan-out of a view to several chats with per-destination failure isolation
//! - **lifecycle**: Time-boxed run state machine and schedule
//! - **config**: Storage paths and process configuration

pub mod book;
pub mod broadcast;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod permission;
pub mod render;

pub use book::ChecklistBook;
pub use broadcast::{
    broadcast, destinations_for, BroadcastReport, Destination, DestinationRole, Outbound,
};
pub use config::{
    data_file, ensure_state_dir, env_file, runtime_state_dir, state_dir, BotConfig,
    DispatchConfig, FreeTextPolicy, LifecycleConfig,
};
pub use dispatch::{
    Authority, Command, Dispatcher, InboundEvent, Outcome, Payload, Rejection, UsageHint,
};
pub use error::{BookError, DeliveryError, LifecycleError};
pub use lifecycle::{Lifecycle, LifecycleEvent, Phase, Schedule, Transition};
pub use permission::{may_edit_items, ScopeKind};
pub use render::{
    companion_unreachable_notice, controls, escape_html, outcome_message, render,
    render_compact, render_full, render_summary, CallbackData, ControlAction, ControlSurface,
    View,
};
