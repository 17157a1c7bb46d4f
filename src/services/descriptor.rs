use crate::contract::{ContractRegistry, MethodId, ReturnShape};
use crate::errors::ClientError;
use crate::managers::pipeline::ActionFilter;
use crate::services::binder::{classify_parameters, ParameterDescriptor};
use crate::services::logger::Logger;
use crate::services::response::{
    parse_nothing, parse_payload, pass_through, raise_for_status, ResponseParser, ResultConverter,
};
use crate::utils::route::{join_route, RouteTemplate};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use reqwest::Method;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub struct MethodDescriptor {
    pub id: MethodId,
    pub route: RouteTemplate,
    pub verb: Method,
    pub auth_required: bool,
    pub params: Vec<ParameterDescriptor>,
    pub filters: Vec<Arc<dyn ActionFilter>>,
    pub returns: ReturnShape,
    pub converter: ResultConverter,
    pub parser: ResponseParser,
    pub multipart: bool,
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filters: Vec<&str> = self.filters.iter().map(|f| f.name()).collect();
        f.debug_struct("MethodDescriptor")
            .field("id", &self.id)
            .field("route", &self.route.template())
            .field("verb", &self.verb)
            .field("auth_required", &self.auth_required)
            .field("params", &self.params)
            .field("filters", &filters)
            .field("returns", &self.returns)
            .field("multipart", &self.multipart)
            .finish()
    }
}

pub struct DescriptorResolver {
    registry: Arc<ContractRegistry>,
    cache: DashMap<MethodId, Arc<MethodDescriptor>>,
    builds: AtomicU64,
    hits: AtomicU64,
    logger: Logger,
}

impl DescriptorResolver {
    pub fn new(registry: Arc<ContractRegistry>, logger: Logger) -> Self {
        Self {
            registry,
            cache: DashMap::new(),
            builds: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            logger: logger.child("descriptor"),
        }
    }

    pub fn registry(&self) -> &ContractRegistry {
        &self.registry
    }

    pub fn resolve(&self, id: &MethodId) -> Result<Arc<MethodDescriptor>, ClientError> {
        let cached = self.cache.get(id).map(|entry| entry.value().clone());
        if let Some(descriptor) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(descriptor);
        }
        match self.cache.entry(*id) {
            Entry::Occupied(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(entry.get().clone())
            }
            Entry::Vacant(slot) => {
                let descriptor = Arc::new(self.build(id)?);
                self.builds.fetch_add(1, Ordering::Relaxed);
                self.logger.debug(
                    "Method descriptor built",
                    Some(&serde_json::json!({
                        "method": id.to_string(),
                        "verb": descriptor.verb.as_str(),
                        "route": descriptor.route.template(),
                        "auth_required": descriptor.auth_required,
                    })),
                );
                slot.insert(descriptor.clone());
                Ok(descriptor)
            }
        }
    }

    fn build(&self, id: &MethodId) -> Result<MethodDescriptor, ClientError> {
        let (interface, method) = self.registry.lookup(id).ok_or_else(|| {
            ClientError::configuration(format!("{} is not a registered method", id))
                .with_hint("Register the interface contract with the client's ContractRegistry.")
        })?;
        let route = method.route.as_deref().ok_or_else(|| {
            ClientError::configuration(format!("{} has no route declaration", id))
        })?;
        let verb = method.verb.clone().ok_or_else(|| {
            ClientError::configuration(format!("{} has no HTTP verb declaration", id))
        })?;

        let route = RouteTemplate::parse(&join_route(interface.route_prefix.as_deref(), route));
        let params = classify_parameters(id, &route, &verb, &method.params)?;

        let mut filters = method.filters.clone();
        filters.sort_by_key(|filter| filter.order());

        let returns = method.returns;
        let converter: ResultConverter = if returns.carries_status() {
            pass_through
        } else {
            raise_for_status
        };
        let parser: ResponseParser = if returns.has_payload() {
            parse_payload
        } else {
            parse_nothing
        };

        Ok(MethodDescriptor {
            id: *id,
            route,
            verb,
            auth_required: (interface.authorize || method.authorize) && !method.allow_anonymous,
            params,
            filters,
            returns,
            converter,
            parser,
            multipart: method.multipart,
        })
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> Value {
        serde_json::json!({
            "descriptors": self.len(),
            "builds": self.builds(),
            "hits": self.hits(),
        })
    }
}
