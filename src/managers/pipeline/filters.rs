use super::{ActionContext, ActionFilter, ActionResult, Next};
use crate::services::logger::Logger;
use async_trait::async_trait;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct HeaderFilter {
    header: String,
    value: String,
    order: i32,
}

impl HeaderFilter {
    pub fn new(header: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            value: value.into(),
            order: 0,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

#[async_trait]
impl ActionFilter for HeaderFilter {
    fn name(&self) -> &str {
        "header"
    }

    fn order(&self) -> i32 {
        self.order
    }

    async fn invoke(&self, ctx: &mut ActionContext, next: Next<'_>) -> ActionResult {
        ctx.request.set_header(&self.header, &self.value)?;
        next.run(ctx).await
    }
}

#[derive(Debug, Clone)]
pub struct TimingFilter {
    logger: Logger,
    order: i32,
}

impl TimingFilter {
    pub fn new(logger: &Logger) -> Self {
        Self {
            logger: logger.child("timing"),
            order: i32::MIN,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

#[async_trait]
impl ActionFilter for TimingFilter {
    fn name(&self) -> &str {
        "timing"
    }

    fn order(&self) -> i32 {
        self.order
    }

    async fn invoke(&self, ctx: &mut ActionContext, next: Next<'_>) -> ActionResult {
        let started = Instant::now();
        let result = next.run(ctx).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        ctx.set_state("elapsed_ms", serde_json::json!(elapsed_ms));
        let status = result.as_ref().ok().map(|r| r.status.as_u16());
        self.logger.info(
            "HTTP call finished",
            Some(&serde_json::json!({
                "invocation_id": ctx.invocation_id.to_string(),
                "method": ctx.method_id().to_string(),
                "status": status,
                "error": result.as_ref().err().map(|err| err.code.clone()),
                "sends": ctx.sends,
                "elapsed_ms": elapsed_ms,
            })),
        );
        result
    }
}
