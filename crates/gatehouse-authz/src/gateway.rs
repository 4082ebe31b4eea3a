//! Per-operation authorization entry points.
//!
//! Every single-resource operation walks the same phases: build the
//! principal, look the entity up (absent entities short-circuit to
//! [`Outcome::NotFound`] before the PDP is consulted), build the resource
//! descriptor, await the decision, reduce it. Transport failures and contract
//! violations propagate as errors and are never folded into
//! [`Outcome::Denied`].

use crate::action::Action;
use crate::audit::{log_decision, log_list_filtered};
use crate::client::DecisionClient;
use crate::correlate::{filter_allowed, is_allowed, CorrelationSet, RequestIndex};
use crate::decision::{AuthzRequest, Decision};
use crate::error::{AuthzError, AuthzResult};
use crate::principal::{IdentityClaims, Principal, PrincipalBuilder};
use crate::resource::{Identified, ResourceDescriptor};
use async_trait::async_trait;
use futures::future::try_join_all;
use gatehouse_common_log::spans::{operation_span, Timer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn, Instrument};

/// Lookup collaborator for the protected collection.
#[async_trait]
pub trait EntityStore<E>: Send + Sync {
    /// Entity with identifier `id`, if it exists.
    async fn find_one(&self, id: &str) -> AuthzResult<Option<E>>;

    /// Every entity, in store order.
    async fn find_all(&self) -> AuthzResult<Vec<E>>;
}

/// Result of a single-resource authorization.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The action may proceed. Carries the entity that was checked.
    Allowed(T),
    /// The PDP answered and said no.
    Denied,
    /// The target entity does not exist.
    NotFound,
}

impl<T> Outcome<T> {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }

    /// The allowed value, if any.
    pub fn allowed(self) -> Option<T> {
        match self {
            Self::Allowed(value) => Some(value),
            Self::Denied | Self::NotFound => None,
        }
    }
}

/// How list operations talk to the PDP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListStrategy {
    /// One batched call for the whole collection.
    #[default]
    Batch,
    /// One call per resource, issued concurrently and joined.
    FanOut,
}

/// Stage of an operation, recorded when it fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    BuildingPrincipal,
    LoadingEntities,
    BuildingResource,
    AwaitingDecision,
    Reducing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BuildingPrincipal => "building_principal",
            Self::LoadingEntities => "loading_entities",
            Self::BuildingResource => "building_resource",
            Self::AwaitingDecision => "awaiting_decision",
            Self::Reducing => "reducing",
        };
        f.write_str(name)
    }
}

/// Gateway settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Resource kind of the protected collection, e.g. `contact`.
    pub kind: String,
    pub list_strategy: ListStrategy,
    /// Upper bound on one PDP exchange. Elapsing is a transport failure.
    pub decision_timeout: Option<Duration>,
}

impl GatewayConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            list_strategy: ListStrategy::default(),
            decision_timeout: None,
        }
    }

    pub fn with_list_strategy(mut self, strategy: ListStrategy) -> Self {
        self.list_strategy = strategy;
        self
    }

    pub fn with_decision_timeout(mut self, timeout: Duration) -> Self {
        self.decision_timeout = Some(timeout);
        self
    }
}

struct Candidate<E> {
    id: String,
    entity: E,
}

impl<E> Identified for Candidate<E> {
    fn resource_id(&self) -> &str {
        &self.id
    }
}

/// Authorization gateway for one resource kind.
pub struct AuthzGateway<E> {
    client: Arc<dyn DecisionClient>,
    store: Arc<dyn EntityStore<E>>,
    principals: PrincipalBuilder,
    config: GatewayConfig,
}

impl<E> Clone for AuthzGateway<E> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            store: self.store.clone(),
            principals: self.principals.clone(),
            config: self.config.clone(),
        }
    }
}

impl<E> AuthzGateway<E>
where
    E: Serialize + Send + Sync,
{
    pub fn new(
        client: Arc<dyn DecisionClient>,
        store: Arc<dyn EntityStore<E>>,
        principals: PrincipalBuilder,
        config: GatewayConfig,
    ) -> Self {
        Self {
            client,
            store,
            principals,
            config,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// May the caller read entity `entity_id`?
    pub async fn authorize_read(
        &self,
        identity: &IdentityClaims,
        entity_id: &str,
    ) -> AuthzResult<Outcome<E>> {
        self.authorize_existing(identity, entity_id, Action::Read).await
    }

    /// May the caller create a new entity?
    pub async fn authorize_create(&self, identity: &IdentityClaims) -> AuthzResult<Outcome<()>> {
        let principal = self.principal(identity, Action::Create)?;
        let span = operation_span(Action::Create.as_str(), &self.config.kind, principal.id());

        async {
            let resource = ResourceDescriptor::for_new(&self.config.kind);
            let resource_id = resource.id().to_string();
            let allowed = self.decide(&principal, resource, Action::Create).await?;
            log_decision(&principal, &self.config.kind, &resource_id, Action::Create, allowed);
            Ok(if allowed { Outcome::Allowed(()) } else { Outcome::Denied })
        }
        .instrument(span)
        .await
    }

    /// May the caller update entity `entity_id`?
    pub async fn authorize_update(
        &self,
        identity: &IdentityClaims,
        entity_id: &str,
    ) -> AuthzResult<Outcome<E>> {
        self.authorize_existing(identity, entity_id, Action::Update).await
    }

    /// May the caller delete entity `entity_id`?
    pub async fn authorize_delete(
        &self,
        identity: &IdentityClaims,
        entity_id: &str,
    ) -> AuthzResult<Outcome<E>> {
        self.authorize_existing(identity, entity_id, Action::Delete).await
    }

    /// Keep the candidates the caller may list, in their original order.
    ///
    /// An empty result is a valid outcome, not a denial.
    pub async fn authorize_list(
        &self,
        identity: &IdentityClaims,
        candidates: Vec<E>,
    ) -> AuthzResult<Vec<E>> {
        let principal = self.principal(identity, Action::List)?;
        let span = operation_span(Action::List.as_str(), &self.config.kind, principal.id());
        self.filter_candidates(&principal, candidates).instrument(span).await
    }

    /// Fetch the whole collection and filter it for the caller.
    pub async fn list(&self, identity: &IdentityClaims) -> AuthzResult<Vec<E>> {
        let principal = self.principal(identity, Action::List)?;
        let span = operation_span(Action::List.as_str(), &self.config.kind, principal.id());

        async {
            let candidates = self
                .store
                .find_all()
                .await
                .map_err(|err| self.fail(Phase::LoadingEntities, Action::List, err))?;
            self.filter_candidates(&principal, candidates).await
        }
        .instrument(span)
        .await
    }

    async fn authorize_existing(
        &self,
        identity: &IdentityClaims,
        entity_id: &str,
        action: Action,
    ) -> AuthzResult<Outcome<E>> {
        let principal = self.principal(identity, action)?;
        let span = operation_span(action.as_str(), &self.config.kind, principal.id());

        async {
            let found = self
                .store
                .find_one(entity_id)
                .await
                .map_err(|err| self.fail(Phase::LoadingEntities, action, err))?;
            let Some(entity) = found else {
                return Ok(Outcome::NotFound);
            };

            let resource = ResourceDescriptor::for_entity(&self.config.kind, &entity)
                .map_err(|err| self.fail(Phase::BuildingResource, action, err))?;
            if resource.id() != entity_id {
                return Err(self.fail(
                    Phase::BuildingResource,
                    action,
                    AuthzError::Store(format!(
                        "lookup for `{entity_id}` returned entity `{}`",
                        resource.id()
                    )),
                ));
            }

            let allowed = self.decide(&principal, resource, action).await?;
            log_decision(&principal, &self.config.kind, entity_id, action, allowed);
            Ok(if allowed { Outcome::Allowed(entity) } else { Outcome::Denied })
        }
        .instrument(span)
        .await
    }

    fn principal(&self, identity: &IdentityClaims, action: Action) -> AuthzResult<Principal> {
        self.principals
            .build(identity)
            .map_err(|err| self.fail(Phase::BuildingPrincipal, action, err))
    }

    async fn decide(
        &self,
        principal: &Principal,
        resource: ResourceDescriptor,
        action: Action,
    ) -> AuthzResult<bool> {
        let request = AuthzRequest::new(principal.clone(), resource, [action]);
        let decision = self
            .bounded(self.client.check_one(&request))
            .await
            .map_err(|err| self.fail(Phase::AwaitingDecision, action, err))?;

        let set = CorrelationSet::correlate(vec![request], vec![decision])
            .map_err(|err| self.fail(Phase::Reducing, action, err))?;
        let decision = set.into_decisions().pop().ok_or_else(|| {
            self.fail(
                Phase::Reducing,
                action,
                AuthzError::malformed("no decision for the requested resource"),
            )
        })?;

        is_allowed(&decision, action).map_err(|err| self.fail(Phase::Reducing, action, err))
    }

    async fn filter_candidates(
        &self,
        principal: &Principal,
        candidates: Vec<E>,
    ) -> AuthzResult<Vec<E>> {
        let action = Action::List;
        if candidates.is_empty() {
            log_list_filtered(principal, &self.config.kind, action, 0, 0);
            return Ok(Vec::new());
        }

        let mut requests = Vec::with_capacity(candidates.len());
        let mut wrapped = Vec::with_capacity(candidates.len());
        for entity in candidates {
            let resource = ResourceDescriptor::for_entity(&self.config.kind, &entity)
                .map_err(|err| self.fail(Phase::BuildingResource, action, err))?;
            wrapped.push(Candidate {
                id: resource.id().to_string(),
                entity,
            });
            requests.push(AuthzRequest::new(principal.clone(), resource, [action]));
        }
        RequestIndex::build(&requests)
            .map_err(|err| self.fail(Phase::BuildingResource, action, err))?;

        let timer = Timer::start("pdp_list");
        let decisions = self
            .bounded(self.fetch_list_decisions(&requests))
            .await
            .map_err(|err| self.fail(Phase::AwaitingDecision, action, err))?;
        timer.finish();

        let set = CorrelationSet::correlate(requests, decisions)
            .map_err(|err| self.fail(Phase::Reducing, action, err))?;
        for resource_id in set.missing() {
            debug!(resource_id, kind = %self.config.kind, "no decision returned, denying");
        }
        let decisions = set.into_decisions();

        let candidates = wrapped.len();
        let kept: Vec<E> = filter_allowed(wrapped, &decisions, action)
            .map_err(|err| self.fail(Phase::Reducing, action, err))?
            .into_iter()
            .map(|candidate| candidate.entity)
            .collect();

        log_list_filtered(principal, &self.config.kind, action, candidates, kept.len());
        Ok(kept)
    }

    async fn fetch_list_decisions(&self, requests: &[AuthzRequest]) -> AuthzResult<Vec<Decision>> {
        match self.config.list_strategy {
            ListStrategy::Batch => self.client.check_many(requests).await,
            // Dropping the joined future on the first error abandons the rest.
            ListStrategy::FanOut => {
                try_join_all(requests.iter().map(|request| self.client.check_one(request))).await
            }
        }
    }

    async fn bounded<T, F>(&self, call: F) -> AuthzResult<T>
    where
        F: std::future::Future<Output = AuthzResult<T>>,
    {
        match self.config.decision_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                AuthzError::transport(format!("no decision within {}ms", limit.as_millis()))
            })?,
            None => call.await,
        }
    }

    fn fail(&self, phase: Phase, action: Action, err: AuthzError) -> AuthzError {
        if err.is_transport() {
            error!(
                phase = %phase,
                action = %action,
                kind = %self.config.kind,
                client = self.client.name(),
                error = %err,
                "PDP unreachable"
            );
        } else if err.is_contract_violation() {
            error!(
                phase = %phase,
                action = %action,
                kind = %self.config.kind,
                client = self.client.name(),
                error = %err,
                "PDP contract violation"
            );
        } else {
            warn!(
                phase = %phase,
                action = %action,
                kind = %self.config.kind,
                error = %err,
                "authorization failed"
            );
        }
        err
    }
}
