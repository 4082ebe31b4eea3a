//! Gateway behavior against scripted decision points.

use async_trait::async_trait;
use gatehouse_authz::pdp::{LocalDecisionClient, RolePolicy};
use gatehouse_authz::{
    Action, AuthzError, AuthzGateway, AuthzRequest, AuthzResult, Decision, DecisionClient,
    EntityStore, GatewayConfig, IdentityClaims, ListStrategy, Outcome, PrincipalBuilder,
    ResourceDescriptor,
};
use gatehouse_test_utils::{assert_err, assert_ok, contact, init_tracing, seed_contacts};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct VecStore {
    entities: Vec<Value>,
}

#[async_trait]
impl EntityStore<Value> for VecStore {
    async fn find_one(&self, id: &str) -> AuthzResult<Option<Value>> {
        Ok(self.entities.iter().find(|e| e["id"] == id).cloned())
    }

    async fn find_all(&self) -> AuthzResult<Vec<Value>> {
        Ok(self.entities.clone())
    }
}

struct BrokenStore;

#[async_trait]
impl EntityStore<Value> for BrokenStore {
    async fn find_one(&self, _id: &str) -> AuthzResult<Option<Value>> {
        Err(AuthzError::Store("connection reset".into()))
    }

    async fn find_all(&self) -> AuthzResult<Vec<Value>> {
        Err(AuthzError::Store("connection reset".into()))
    }
}

enum Script {
    /// Grant these actions per resource id, deny everything else.
    Grants(HashMap<String, Vec<Action>>),
    /// Fail every call as unreachable.
    Unreachable,
    /// Answer after a delay.
    Slow(Duration),
    /// Leave these resource ids out of batch answers.
    Omit(Vec<String>),
}

struct ScriptedClient {
    script: Script,
    one_calls: AtomicUsize,
    many_calls: AtomicUsize,
}

impl ScriptedClient {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            one_calls: AtomicUsize::new(0),
            many_calls: AtomicUsize::new(0),
        })
    }

    fn granting(grants: &[(&str, &[Action])]) -> Arc<Self> {
        let grants = grants
            .iter()
            .map(|(id, actions)| (id.to_string(), actions.to_vec()))
            .collect();
        Self::new(Script::Grants(grants))
    }

    fn calls(&self) -> usize {
        self.one_calls.load(Ordering::SeqCst) + self.many_calls.load(Ordering::SeqCst)
    }

    fn answer(&self, request: &AuthzRequest) -> AuthzResult<Decision> {
        match &self.script {
            Script::Grants(grants) => {
                let granted = grants
                    .get(request.resource().id())
                    .map(|actions| {
                        actions
                            .iter()
                            .copied()
                            .filter(|a| request.requests(*a))
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();
                Decision::for_request(request, granted)
            }
            Script::Unreachable => Err(AuthzError::transport("connection refused")),
            Script::Slow(_) | Script::Omit(_) => {
                Decision::for_request(request, request.actions().to_vec())
            }
        }
    }
}

#[async_trait]
impl DecisionClient for ScriptedClient {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn check_one(&self, request: &AuthzRequest) -> AuthzResult<Decision> {
        self.one_calls.fetch_add(1, Ordering::SeqCst);
        if let Script::Slow(delay) = &self.script {
            tokio::time::sleep(*delay).await;
        }
        self.answer(request)
    }

    async fn check_many(&self, requests: &[AuthzRequest]) -> AuthzResult<Vec<Decision>> {
        self.many_calls.fetch_add(1, Ordering::SeqCst);
        if let Script::Slow(delay) = &self.script {
            tokio::time::sleep(*delay).await;
        }
        let omitted: &[String] = match &self.script {
            Script::Omit(ids) => ids,
            _ => &[],
        };
        requests
            .iter()
            .filter(|r| !omitted.iter().any(|id| id == r.resource().id()))
            .map(|r| self.answer(r))
            .collect()
    }
}

fn gateway(client: Arc<ScriptedClient>, config: GatewayConfig) -> AuthzGateway<Value> {
    init_tracing();
    AuthzGateway::<Value>::new(
        client,
        Arc::new(VecStore {
            entities: seed_contacts(),
        }),
        PrincipalBuilder::default(),
        config,
    )
}

fn user() -> IdentityClaims {
    IdentityClaims::for_subject("u1").with_roles(["user"])
}

#[tokio::test]
async fn test_read_allowed_returns_entity() {
    let client = ScriptedClient::granting(&[("contact-1", &[Action::Read])]);
    let gw = gateway(client.clone(), GatewayConfig::new("contact"));

    let outcome = assert_ok!(gw.authorize_read(&user(), "contact-1").await);
    let entity = outcome.allowed().unwrap();
    assert_eq!(entity["name"], "John Smith");
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn test_read_denied_withholds_entity() {
    let client = ScriptedClient::granting(&[]);
    let gw = gateway(client, GatewayConfig::new("contact"));

    let outcome = assert_ok!(gw.authorize_read(&user(), "contact-1").await);
    assert_eq!(outcome, Outcome::Denied);
}

#[tokio::test]
async fn test_missing_entity_skips_pdp() {
    let client = ScriptedClient::granting(&[("contact-999", &[Action::Read])]);
    let gw = gateway(client.clone(), GatewayConfig::new("contact"));

    let outcome = assert_ok!(gw.authorize_read(&user(), "contact-999").await);
    assert_eq!(outcome, Outcome::NotFound);
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_list_keeps_only_allowed_in_order() {
    let client = ScriptedClient::granting(&[("contact-2", &[Action::List])]);
    let gw = gateway(client.clone(), GatewayConfig::new("contact"));

    let kept = assert_ok!(gw.list(&user()).await);
    assert_eq!(kept, vec![contact("contact-2", "Sarah Jane", "sarah@acme.com")]);
    assert_eq!(client.many_calls.load(Ordering::SeqCst), 1);
    assert_eq!(client.one_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_list_fan_out_issues_one_call_per_entity() {
    let client = ScriptedClient::granting(&[
        ("contact-1", &[Action::List]),
        ("contact-2", &[Action::List]),
    ]);
    let gw = gateway(
        client.clone(),
        GatewayConfig::new("contact").with_list_strategy(ListStrategy::FanOut),
    );

    let kept = assert_ok!(gw.list(&user()).await);
    assert_eq!(kept, seed_contacts());
    assert_eq!(client.one_calls.load(Ordering::SeqCst), 2);
    assert_eq!(client.many_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_list_treats_missing_decision_as_denied() {
    let client = ScriptedClient::new(Script::Omit(vec!["contact-1".into()]));
    let gw = gateway(client, GatewayConfig::new("contact"));

    let kept = assert_ok!(gw.list(&user()).await);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0]["id"], "contact-2");
}

#[tokio::test]
async fn test_empty_list_skips_pdp() {
    let client = ScriptedClient::granting(&[]);
    let gw = gateway(client.clone(), GatewayConfig::new("contact"));

    let kept = assert_ok!(gw.authorize_list(&user(), Vec::new()).await);
    assert!(kept.is_empty());
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_list_rejects_duplicate_ids() {
    let client = ScriptedClient::granting(&[]);
    let gw = gateway(client.clone(), GatewayConfig::new("contact"));
    let dupes = vec![contact("c1", "A", "a@x"), contact("c1", "B", "b@x")];

    let err = assert_err!(gw.authorize_list(&user(), dupes).await);
    assert!(matches!(err, AuthzError::DuplicateResource(id) if id == "c1"));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_list_rejects_entity_without_id() {
    let client = ScriptedClient::granting(&[]);
    let gw = gateway(client, GatewayConfig::new("contact"));
    let candidates = vec![serde_json::json!({ "name": "anonymous" })];

    let err = assert_err!(gw.authorize_list(&user(), candidates).await);
    assert!(matches!(err, AuthzError::MissingIdentifier { .. }));
}

#[tokio::test]
async fn test_transport_failure_is_not_a_denial() {
    let client = ScriptedClient::new(Script::Unreachable);
    let gw = gateway(client, GatewayConfig::new("contact"));

    for result in [
        gw.authorize_read(&user(), "contact-1").await,
        gw.authorize_update(&user(), "contact-1").await,
        gw.authorize_delete(&user(), "contact-1").await,
    ] {
        let err = assert_err!(result);
        assert!(err.is_transport());
    }
    assert!(assert_err!(gw.authorize_create(&user()).await).is_transport());
    assert!(assert_err!(gw.list(&user()).await).is_transport());
}

#[tokio::test]
async fn test_fan_out_transport_failure_fails_whole_list() {
    let client = ScriptedClient::new(Script::Unreachable);
    let gw = gateway(
        client,
        GatewayConfig::new("contact").with_list_strategy(ListStrategy::FanOut),
    );

    assert!(assert_err!(gw.list(&user()).await).is_transport());
}

#[tokio::test(start_paused = true)]
async fn test_decision_timeout_is_transport() {
    let client = ScriptedClient::new(Script::Slow(Duration::from_secs(5)));
    let gw = gateway(
        client,
        GatewayConfig::new("contact").with_decision_timeout(Duration::from_millis(100)),
    );

    let err = assert_err!(gw.authorize_read(&user(), "contact-1").await);
    assert!(matches!(err, AuthzError::Transport { .. }));
}

#[tokio::test]
async fn test_blank_subject_is_invalid_identity() {
    let client = ScriptedClient::granting(&[("contact-1", &[Action::Read])]);
    let gw = gateway(client.clone(), GatewayConfig::new("contact"));

    let blank = IdentityClaims::for_subject("  ");
    let err = assert_err!(gw.authorize_read(&blank, "contact-1").await);
    assert!(matches!(err, AuthzError::InvalidIdentity(_)));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_create_checks_new_resource() {
    let client = ScriptedClient::granting(&[("new", &[Action::Create])]);
    let gw = gateway(client, GatewayConfig::new("contact"));

    assert_eq!(assert_ok!(gw.authorize_create(&user()).await), Outcome::Allowed(()));
}

#[tokio::test]
async fn test_local_policy_scopes_updates_to_owner() {
    init_tracing();
    let store = Arc::new(VecStore {
        entities: vec![
            serde_json::json!({ "id": "c1", "name": "Mine", "owner": "u1" }),
            serde_json::json!({ "id": "c2", "name": "Theirs", "owner": "u2" }),
        ],
    });
    let client = Arc::new(LocalDecisionClient::new(RolePolicy::standard("contact")));
    let gw = AuthzGateway::<Value>::new(
        client,
        store,
        PrincipalBuilder::default(),
        GatewayConfig::new("contact"),
    );

    assert!(assert_ok!(gw.authorize_update(&user(), "c1").await).is_allowed());
    assert_eq!(assert_ok!(gw.authorize_update(&user(), "c2").await), Outcome::Denied);
    assert!(assert_ok!(gw.authorize_read(&user(), "c2").await).is_allowed());

    let viewer = IdentityClaims::for_subject("v1").with_roles(["viewer"]);
    assert_eq!(assert_ok!(gw.authorize_create(&viewer).await), Outcome::Denied);
    assert_eq!(assert_ok!(gw.list(&viewer).await).len(), 2);
}

#[tokio::test]
async fn test_store_failure_propagates_without_pdp_call() {
    init_tracing();
    let client = ScriptedClient::granting(&[("contact-1", &[Action::Read, Action::List])]);
    let gw = AuthzGateway::<Value>::new(
        client.clone(),
        Arc::new(BrokenStore),
        PrincipalBuilder::default(),
        GatewayConfig::new("contact"),
    );

    let err = assert_err!(gw.authorize_read(&user(), "contact-1").await);
    assert!(matches!(err, AuthzError::Store(_)));
    let err = assert_err!(gw.list(&user()).await);
    assert!(matches!(err, AuthzError::Store(_)));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_repeated_requests_get_same_decision() {
    let client = LocalDecisionClient::new(RolePolicy::standard("contact"));
    let principal = PrincipalBuilder::default().build(&user()).unwrap();
    let requests: Vec<AuthzRequest> = seed_contacts()
        .iter()
        .map(|entity| {
            let resource = ResourceDescriptor::for_entity("contact", entity).unwrap();
            AuthzRequest::new(principal.clone(), resource, Action::ALL)
        })
        .collect();

    for request in &requests {
        let first = assert_ok!(client.check_one(request).await);
        let second = assert_ok!(client.check_one(request).await);
        assert_eq!(first, second);
    }
    let first = assert_ok!(client.check_many(&requests).await);
    let second = assert_ok!(client.check_many(&requests).await);
    assert_eq!(first, second);

    let gw = gateway(
        ScriptedClient::granting(&[("contact-2", &[Action::Read, Action::List])]),
        GatewayConfig::new("contact"),
    );
    assert_eq!(
        assert_ok!(gw.authorize_read(&user(), "contact-1").await),
        assert_ok!(gw.authorize_read(&user(), "contact-1").await)
    );
    assert_eq!(assert_ok!(gw.list(&user()).await), assert_ok!(gw.list(&user()).await));
}
