use super::{ActionContext, ActionResult};
use crate::errors::{ClientError, ClientErrorKind};
use crate::services::auth::AuthHandler;
use crate::services::logger::Logger;
use crate::services::request::OutgoingRequest;
use crate::services::response::{HttpResult, RawResponse};
use crate::services::serializer::Serializer;
use crate::services::settings::{ClientSettings, RetryOutcome, RetryPolicy};
use crate::services::transport::Transport;
use crate::utils::redact::headers_for_log;
use reqwest::StatusCode;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub struct Executor {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    auth_handler: Option<Arc<dyn AuthHandler>>,
    serializer: Arc<dyn Serializer>,
    logger: Logger,
}

impl Executor {
    pub fn new(transport: Arc<dyn Transport>, settings: &ClientSettings, logger: &Logger) -> Self {
        Self {
            transport,
            retry: settings.retry.clone(),
            auth_handler: settings.auth_handler.clone(),
            serializer: settings.serializer.clone(),
            logger: logger.child("executor"),
        }
    }

    pub async fn execute(&self, ctx: &mut ActionContext) -> ActionResult {
        let raw = self.send_with_retry(ctx).await?;
        let content = (ctx.descriptor.parser)(&raw, self.serializer.as_ref())?;
        Ok(HttpResult::from_raw(raw, content))
    }

    async fn send_with_retry(&self, ctx: &mut ActionContext) -> RetryOutcome {
        let mut retries = 0usize;
        loop {
            let outcome = self.send_once(ctx).await;
            if matches!(&outcome, Err(err) if !err.is_transport()) {
                return outcome;
            }
            if retries < self.retry.max_retries && self.retry.should_retry(&outcome) {
                retries += 1;
                let delay_ms = self.retry.compute_delay(retries, &outcome);
                self.logger.warn(
                    "HTTP retry",
                    Some(&json!({
                        "invocation_id": ctx.invocation_id.to_string(),
                        "method": ctx.method_id().to_string(),
                        "retry": retries,
                        "max_retries": self.retry.max_retries,
                        "status": outcome.as_ref().ok().map(|r| r.status.as_u16()),
                        "error": outcome.as_ref().err().map(|err| err.message.clone()),
                        "delay_ms": delay_ms,
                    })),
                );
                if delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                continue;
            }
            return outcome;
        }
    }

    async fn send_once(&self, ctx: &mut ActionContext) -> RetryOutcome {
        let mut request = ctx.request.clone();
        let handler = if ctx.descriptor.auth_required {
            self.auth_handler.as_ref()
        } else {
            None
        };
        if let Some(handler) = handler {
            handler.attach(&mut request).await.map_err(attach_error)?;
        }
        let resend = handler.map(|_| request.clone());

        self.logger.debug(
            "HTTP request",
            Some(&json!({
                "invocation_id": ctx.invocation_id.to_string(),
                "method": request.method.as_str(),
                "url": request.url.as_str(),
                "headers": headers_for_log(&request.headers),
            })),
        );
        ctx.sends += 1;
        let response = self.transport.send(request).await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        let (Some(handler), Some(resend)) = (handler, resend) else {
            return Ok(response);
        };
        self.refresh_and_resend(ctx, handler.as_ref(), resend, response)
            .await
    }

    async fn refresh_and_resend(
        &self,
        ctx: &mut ActionContext,
        handler: &dyn AuthHandler,
        mut resend: OutgoingRequest,
        unauthorized: RawResponse,
    ) -> RetryOutcome {
        let meta = json!({
            "invocation_id": ctx.invocation_id.to_string(),
            "method": ctx.method_id().to_string(),
        });
        match handler.refresh(&mut resend).await {
            Ok(true) => {
                self.logger.info("Credentials refreshed after 401, resending", Some(&meta));
                ctx.sends += 1;
                self.transport.send(resend).await
            }
            Ok(false) => {
                self.logger
                    .info("Credential refresh declined, keeping 401", Some(&meta));
                Ok(unauthorized)
            }
            Err(err) => {
                self.logger.warn(
                    "Credential refresh failed, keeping 401",
                    Some(&json!({
                        "invocation_id": ctx.invocation_id.to_string(),
                        "method": ctx.method_id().to_string(),
                        "error": err.message,
                    })),
                );
                Ok(unauthorized)
            }
        }
    }
}

fn attach_error(err: ClientError) -> ClientError {
    match err.kind {
        ClientErrorKind::Auth | ClientErrorKind::Configuration => err,
        _ => ClientError::auth(format!("Failed to attach credentials: {}", err.message))
            .with_hint("Check the configured auth handler."),
    }
}
