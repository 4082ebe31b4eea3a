//! Gatehouse authorization core.
//!
//! Builds principal/resource/action tuples, sends them singly or in bulk to
//! an external policy decision point (PDP), matches the returned decisions
//! back to their resources and reduces them to an [`Outcome`] or a filtered
//! collection.
//!
//! # Components
//!
//! - [`PrincipalBuilder`]: identity claims to [`Principal`]
//! - [`ResourceDescriptor`]: entity to authorization-facing descriptor
//! - [`DecisionClient`]: PDP transport, with [`pdp::HttpDecisionClient`] and
//!   [`pdp::LocalDecisionClient`] adapters
//! - [`correlate`]: identifier-keyed correlation and reduction
//! - [`AuthzGateway`]: per-operation entry points

#![warn(clippy::all)]

pub mod action;
pub mod audit;
pub mod client;
pub mod correlate;
pub mod decision;
pub mod error;
pub mod gateway;
pub mod pdp;
pub mod principal;
pub mod resource;

pub use action::Action;
pub use client::DecisionClient;
pub use correlate::{filter_allowed, is_allowed, CorrelationSet};
pub use decision::{AuthzRequest, Decision, DecisionPayload};
pub use error::{AuthzError, AuthzResult};
pub use gateway::{AuthzGateway, EntityStore, GatewayConfig, ListStrategy, Outcome};
pub use principal::{IdentityClaims, Principal, PrincipalBuilder, DEFAULT_ROLE};
pub use resource::{to_resource, Identified, ResourceDescriptor, NEW_RESOURCE_ID};
