use std::collections::HashMap;
use std::sync::Arc;

use feedline_auth::{AuthGate, Identity, MembershipDirectory, container_access_check};
use feedline_core::{FeedError, Record};
use feedline_events::{Topic, TopicBus};

use super::feed::FeedSubscription;
use super::filter::{FilterArgs, RecordFilter};

/// Client-facing name of the record creation subscription.
pub const RECORD_CREATED_SUBSCRIPTION: &str = "recordCreated";

/// A client's request to open a live subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeRequest {
    /// Client-facing subscription name, resolved through the route table.
    pub topic: String,
    pub filter_args: FilterArgs,
    pub identity: Option<Identity>,
}

impl SubscribeRequest {
    pub fn new(topic: impl Into<String>, filter_args: FilterArgs, identity: Option<Identity>) -> Self {
        Self {
            topic: topic.into(),
            filter_args,
            identity,
        }
    }
}

/// Opens subscriptions: bus subscription, authorization gate, record filter.
pub struct SubscriptionRouter<B> {
    bus: B,
    directory: Arc<dyn MembershipDirectory>,
    gate: AuthGate,
    routes: HashMap<String, Topic>,
}

impl<B> SubscriptionRouter<B>
where
    B: TopicBus<Arc<Record>>,
{
    pub fn new(bus: B, directory: Arc<dyn MembershipDirectory>, gate: AuthGate) -> Self {
        let mut routes = HashMap::new();
        routes.insert(RECORD_CREATED_SUBSCRIPTION.to_string(), Topic::record_created());
        Self {
            bus,
            directory,
            gate,
            routes,
        }
    }

    /// Expose `topic` to clients under `name`.
    pub fn with_route(mut self, name: impl Into<String>, topic: Topic) -> Self {
        self.routes.insert(name.into(), topic);
        self
    }

    pub fn resolve_topic(&self, name: &str) -> Option<&Topic> {
        self.routes.get(name)
    }

    pub fn route_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.routes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Open a subscription.
    ///
    /// Fails synchronously on an unknown subscription name or an empty
    /// container list. Authorization is checked once, asynchronously; a denial
    /// shows up as the first item of the returned subscription.
    ///
    /// Must be called from within a tokio runtime.
    pub fn route(&self, request: SubscribeRequest) -> Result<FeedSubscription, FeedError> {
        let topic = self
            .resolve_topic(&request.topic)
            .cloned()
            .ok_or_else(|| FeedError::UnknownTopic(request.topic.clone()))?;

        let containers = request.filter_args.distinct_containers();
        if containers.is_empty() {
            return Err(FeedError::invalid_request("containerIds must not be empty"));
        }

        // Without an identity the check fails on its own; the filter then never runs.
        let viewer = request.identity.as_ref().map(Identity::id).unwrap_or_default();
        let filter = RecordFilter::new(containers.iter().copied(), viewer);
        let check = container_access_check(Arc::clone(&self.directory), request.identity, containers);

        let subscription = self.bus.subscribe(&topic);
        tracing::info!(
            subscriber = %subscription.id(),
            %topic,
            subscription = %request.topic,
            "subscription opened"
        );

        let channel = self.gate.gate(subscription, check);
        Ok(FeedSubscription::new(request.topic, channel, filter))
    }
}

impl<B> core::fmt::Debug for SubscriptionRouter<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SubscriptionRouter")
            .field("gate", &self.gate)
            .field("routes", &self.routes)
            .finish()
    }
}
