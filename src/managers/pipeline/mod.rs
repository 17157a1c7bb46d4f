mod executor;
mod filters;

pub use executor::Executor;
pub use filters::{HeaderFilter, TimingFilter};

use crate::contract::{ArgValue, Args, MethodId};
use crate::errors::ClientError;
use crate::services::descriptor::MethodDescriptor;
use crate::services::request::OutgoingRequest;
use crate::services::response::HttpResult;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub type ActionResult = Result<HttpResult<Value>, ClientError>;

#[async_trait]
pub trait ActionFilter: Send + Sync {
    fn name(&self) -> &str {
        "filter"
    }

    fn order(&self) -> i32 {
        0
    }

    async fn invoke(&self, ctx: &mut ActionContext, next: Next<'_>) -> ActionResult;
}

pub struct ActionContext {
    pub invocation_id: Uuid,
    pub descriptor: Arc<MethodDescriptor>,
    pub arguments: HashMap<String, ArgValue>,
    pub request: OutgoingRequest,
    pub state: HashMap<String, Value>,
    pub sends: usize,
}

impl ActionContext {
    pub fn new(descriptor: Arc<MethodDescriptor>, args: &Args, request: OutgoingRequest) -> Self {
        Self {
            invocation_id: Uuid::new_v4(),
            descriptor,
            arguments: args
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
            request,
            state: HashMap::new(),
            sends: 0,
        }
    }

    pub fn method_id(&self) -> MethodId {
        self.descriptor.id
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name).and_then(|value| value.as_json())
    }

    pub fn set_state(&mut self, key: impl Into<String>, value: Value) {
        self.state.insert(key.into(), value);
    }

    pub fn state(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }
}

#[derive(Clone, Copy)]
pub struct Next<'a> {
    filters: &'a [Arc<dyn ActionFilter>],
    terminal: &'a Executor,
}

impl<'a> Next<'a> {
    pub(crate) fn new(filters: &'a [Arc<dyn ActionFilter>], terminal: &'a Executor) -> Self {
        Self { filters, terminal }
    }

    pub fn remaining(&self) -> usize {
        self.filters.len()
    }

    pub fn run<'b>(self, ctx: &'b mut ActionContext) -> BoxFuture<'b, ActionResult>
    where
        'a: 'b,
    {
        Box::pin(async move {
            match self.filters.split_first() {
                Some((filter, rest)) => {
                    filter
                        .invoke(
                            ctx,
                            Next {
                                filters: rest,
                                terminal: self.terminal,
                            },
                        )
                        .await
                }
                None => self.terminal.execute(ctx).await,
            }
        })
    }
}
