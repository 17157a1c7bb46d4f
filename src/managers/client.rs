use crate::constants::{network, protocols};
use crate::contract::{Args, ContractRegistry, MethodId, ReturnShape};
use crate::errors::ClientError;
use crate::managers::pipeline::{ActionContext, Executor, Next};
use crate::services::binder::bind_arguments;
use crate::services::descriptor::{DescriptorResolver, MethodDescriptor};
use crate::services::logger::Logger;
use crate::services::request::build_request;
use crate::services::response::HttpResult;
use crate::services::settings::ClientSettings;
use crate::services::transport::{ReqwestTransport, Transport};
use futures::future::BoxFuture;
use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use url::Url;

pub type Pending<T> = BoxFuture<'static, Result<T, ClientError>>;

static BLOCKING_RUNTIME: OnceCell<Runtime> = OnceCell::new();

fn blocking_runtime() -> Result<&'static Runtime, ClientError> {
    BLOCKING_RUNTIME.get_or_try_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(network::BLOCKING_WORKER_THREADS)
            .thread_name("routecall-blocking")
            .enable_all()
            .build()
            .map_err(|err| {
                ClientError::internal(format!("Failed to start blocking runtime: {}", err))
            })
    })
}

fn block_on<T: Send + 'static>(pending: Pending<T>) -> Result<T, ClientError> {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| handle.block_on(pending))
        }
        Ok(_) => {
            let task = blocking_runtime()?.spawn(pending);
            futures::executor::block_on(task).map_err(|err| {
                ClientError::internal(format!("Blocking call did not complete: {}", err))
            })?
        }
        Err(_) => blocking_runtime()?.block_on(pending),
    }
}

struct ClientInner {
    base_url: Url,
    settings: ClientSettings,
    resolver: Arc<DescriptorResolver>,
    executor: Executor,
    logger: Logger,
}

#[derive(Clone)]
pub struct RestClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("settings", &self.inner.settings)
            .finish()
    }
}

impl RestClient {
    pub fn builder(base_url: impl Into<String>) -> RestClientBuilder {
        RestClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.inner.settings
    }

    pub fn resolver(&self) -> &Arc<DescriptorResolver> {
        &self.inner.resolver
    }

    pub async fn invoke(&self, id: MethodId, args: Args) -> Result<HttpResult<Value>, ClientError> {
        let descriptor = self.inner.resolver.resolve(&id)?;
        self.run(descriptor, args).await
    }

    pub fn call<T>(&self, id: MethodId, args: Args) -> Pending<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let client = self.clone();
        Box::pin(async move {
            let descriptor = client.expect_shape(&id, ReturnShape::AsyncPayload)?;
            client.run(descriptor, args).await?.decode_payload::<T>()
        })
    }

    pub fn call_result<T>(&self, id: MethodId, args: Args) -> Pending<HttpResult<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let client = self.clone();
        Box::pin(async move {
            let descriptor = client.expect_shape(&id, ReturnShape::AsyncResult)?;
            client.run(descriptor, args).await?.decode::<T>()
        })
    }

    pub fn call_unit(&self, id: MethodId, args: Args) -> Pending<()> {
        let client = self.clone();
        Box::pin(async move {
            let descriptor = client.expect_shape(&id, ReturnShape::AsyncUnit)?;
            client.run(descriptor, args).await.map(|_| ())
        })
    }

    pub fn call_blocking<T>(&self, id: MethodId, args: Args) -> Result<T, ClientError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let descriptor = self.expect_shape(&id, ReturnShape::BlockingPayload)?;
        let client = self.clone();
        block_on(Box::pin(async move {
            client.run(descriptor, args).await?.decode_payload::<T>()
        }))
    }

    pub fn call_result_blocking<T>(
        &self,
        id: MethodId,
        args: Args,
    ) -> Result<HttpResult<T>, ClientError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let descriptor = self.expect_shape(&id, ReturnShape::BlockingResult)?;
        let client = self.clone();
        block_on(Box::pin(async move {
            client.run(descriptor, args).await?.decode::<T>()
        }))
    }

    pub fn call_unit_blocking(&self, id: MethodId, args: Args) -> Result<(), ClientError> {
        let descriptor = self.expect_shape(&id, ReturnShape::BlockingUnit)?;
        let client = self.clone();
        block_on(Box::pin(async move {
            client.run(descriptor, args).await.map(|_| ())
        }))
    }

    fn expect_shape(
        &self,
        id: &MethodId,
        expected: ReturnShape,
    ) -> Result<Arc<MethodDescriptor>, ClientError> {
        let descriptor = self.inner.resolver.resolve(id)?;
        if descriptor.returns != expected {
            return Err(ClientError::configuration(format!(
                "{} is declared as {:?} but was invoked as {:?}",
                id, descriptor.returns, expected
            ))
            .with_hint("Call the adapter that matches the declared return shape."));
        }
        Ok(descriptor)
    }

    async fn run(
        &self,
        descriptor: Arc<MethodDescriptor>,
        args: Args,
    ) -> Result<HttpResult<Value>, ClientError> {
        let inner = &self.inner;
        let bound = bind_arguments(&descriptor.id, &descriptor.params, &args)?;
        let request = build_request(
            &inner.base_url,
            &descriptor,
            &bound,
            inner.settings.serializer.as_ref(),
            &inner.settings.default_headers,
        )?;
        let mut ctx = ActionContext::new(descriptor.clone(), &args, request);
        let result = Next::new(&descriptor.filters, &inner.executor)
            .run(&mut ctx)
            .await;
        inner.logger.debug(
            "Invocation finished",
            Some(&serde_json::json!({
                "invocation_id": ctx.invocation_id.to_string(),
                "method": descriptor.id.to_string(),
                "status": result.as_ref().ok().map(|r| r.status.as_u16()),
                "error": result.as_ref().err().map(|err| err.code.clone()),
                "sends": ctx.sends,
            })),
        );
        (descriptor.converter)(result?)
    }
}

pub struct RestClientBuilder {
    base_url: String,
    settings: ClientSettings,
    registry: Option<Arc<ContractRegistry>>,
    resolver: Option<Arc<DescriptorResolver>>,
    transport: Option<Arc<dyn Transport>>,
    logger: Option<Logger>,
}

impl RestClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            settings: ClientSettings::default(),
            registry: None,
            resolver: None,
            transport: None,
            logger: None,
        }
    }

    pub fn settings(mut self, settings: ClientSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn registry(mut self, registry: impl Into<Arc<ContractRegistry>>) -> Self {
        self.registry = Some(registry.into());
        self
    }

    pub fn resolver(mut self, resolver: Arc<DescriptorResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> Result<RestClient, ClientError> {
        let base_url = Url::parse(self.base_url.trim()).map_err(|err| {
            ClientError::configuration(format!("Invalid base URL '{}': {}", self.base_url, err))
        })?;
        let protocol = format!("{}:", base_url.scheme());
        if !protocols::ALLOWED_HTTP.contains(&protocol.as_str()) {
            return Err(ClientError::configuration(format!(
                "Unsupported base URL scheme '{}'",
                base_url.scheme()
            )));
        }
        let logger = self.logger.unwrap_or_else(|| Logger::new("routecall"));
        let resolver = match (self.resolver, self.registry) {
            (Some(resolver), _) => resolver,
            (None, Some(registry)) => Arc::new(DescriptorResolver::new(registry, logger.clone())),
            (None, None) => {
                return Err(ClientError::configuration(
                    "A contract registry or a shared descriptor resolver is required",
                ))
            }
        };
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(self.settings.timeout_ms)?),
        };
        let executor = Executor::new(transport, &self.settings, &logger);
        Ok(RestClient {
            inner: Arc::new(ClientInner {
                base_url,
                settings: self.settings,
                resolver,
                executor,
                logger: logger.child("client"),
            }),
        })
    }
}
