mod args;

pub use args::{ArgValue, Args, BinaryPart};

use crate::managers::pipeline::ActionFilter;
use reqwest::Method;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId {
    pub interface: &'static str,
    pub method: &'static str,
}

impl MethodId {
    pub const fn new(interface: &'static str, method: &'static str) -> Self {
        Self { interface, method }
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.interface, self.method)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamRole {
    Path,
    Query,
    Header,
    Body,
    Form,
}

impl fmt::Display for ParamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path => write!(f, "path"),
            Self::Query => write!(f, "query"),
            Self::Header => write!(f, "header"),
            Self::Body => write!(f, "body"),
            Self::Form => write!(f, "form"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    pub name: String,
    pub alias: Option<String>,
    pub roles: Vec<ParamRole>,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            roles: Vec::new(),
        }
    }

    pub fn path(name: impl Into<String>) -> Self {
        Self::new(name).role(ParamRole::Path)
    }

    pub fn query(name: impl Into<String>) -> Self {
        Self::new(name).role(ParamRole::Query)
    }

    pub fn header(name: impl Into<String>) -> Self {
        Self::new(name).role(ParamRole::Header)
    }

    pub fn body(name: impl Into<String>) -> Self {
        Self::new(name).role(ParamRole::Body)
    }

    pub fn form(name: impl Into<String>) -> Self {
        Self::new(name).role(ParamRole::Form)
    }

    pub fn role(mut self, role: ParamRole) -> Self {
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        if !alias.trim().is_empty() {
            self.alias = Some(alias);
        }
        self
    }

    pub fn key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn is_annotated(&self) -> bool {
        !self.roles.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnShape {
    AsyncPayload,
    AsyncResult,
    AsyncUnit,
    BlockingResult,
    BlockingPayload,
    BlockingUnit,
}

impl ReturnShape {
    pub fn is_async(self) -> bool {
        matches!(
            self,
            ReturnShape::AsyncPayload | ReturnShape::AsyncResult | ReturnShape::AsyncUnit
        )
    }

    pub fn carries_status(self) -> bool {
        matches!(self, ReturnShape::AsyncResult | ReturnShape::BlockingResult)
    }

    pub fn has_payload(self) -> bool {
        !matches!(self, ReturnShape::AsyncUnit | ReturnShape::BlockingUnit)
    }
}

#[derive(Clone)]
pub struct MethodContract {
    pub name: &'static str,
    pub route: Option<String>,
    pub verb: Option<Method>,
    pub authorize: bool,
    pub allow_anonymous: bool,
    pub params: Vec<ParamDecl>,
    pub filters: Vec<Arc<dyn ActionFilter>>,
    pub multipart: bool,
    pub returns: ReturnShape,
}

impl MethodContract {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            route: None,
            verb: None,
            authorize: false,
            allow_anonymous: false,
            params: Vec::new(),
            filters: Vec::new(),
            multipart: false,
            returns: ReturnShape::AsyncPayload,
        }
    }

    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn verb(mut self, verb: Method) -> Self {
        self.verb = Some(verb);
        self
    }

    pub fn get(self, route: impl Into<String>) -> Self {
        self.verb(Method::GET).route(route)
    }

    pub fn post(self, route: impl Into<String>) -> Self {
        self.verb(Method::POST).route(route)
    }

    pub fn put(self, route: impl Into<String>) -> Self {
        self.verb(Method::PUT).route(route)
    }

    pub fn patch(self, route: impl Into<String>) -> Self {
        self.verb(Method::PATCH).route(route)
    }

    pub fn delete(self, route: impl Into<String>) -> Self {
        self.verb(Method::DELETE).route(route)
    }

    pub fn authorize(mut self) -> Self {
        self.authorize = true;
        self
    }

    pub fn allow_anonymous(mut self) -> Self {
        self.allow_anonymous = true;
        self
    }

    pub fn param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    pub fn filter(mut self, filter: Arc<dyn ActionFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn multipart(mut self) -> Self {
        self.multipart = true;
        self
    }

    pub fn returns(mut self, shape: ReturnShape) -> Self {
        self.returns = shape;
        self
    }
}

impl fmt::Debug for MethodContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodContract")
            .field("name", &self.name)
            .field("route", &self.route)
            .field("verb", &self.verb)
            .field("authorize", &self.authorize)
            .field("allow_anonymous", &self.allow_anonymous)
            .field("params", &self.params)
            .field("filters", &self.filters.len())
            .field("multipart", &self.multipart)
            .field("returns", &self.returns)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct InterfaceContract {
    pub name: &'static str,
    pub route_prefix: Option<String>,
    pub authorize: bool,
    methods: HashMap<&'static str, MethodContract>,
}

impl InterfaceContract {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            route_prefix: None,
            authorize: false,
            methods: HashMap::new(),
        }
    }

    pub fn route_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.route_prefix = Some(prefix.into());
        self
    }

    pub fn authorize(mut self) -> Self {
        self.authorize = true;
        self
    }

    pub fn method(mut self, method: MethodContract) -> Self {
        self.methods.insert(method.name, method);
        self
    }

    pub fn get_method(&self, name: &str) -> Option<&MethodContract> {
        self.methods.get(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContractRegistry {
    interfaces: HashMap<&'static str, InterfaceContract>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, interface: InterfaceContract) -> Self {
        self.interfaces.insert(interface.name, interface);
        self
    }

    pub fn lookup(&self, id: &MethodId) -> Option<(&InterfaceContract, &MethodContract)> {
        let interface = self.interfaces.get(id.interface)?;
        let method = interface.get_method(id.method)?;
        Some((interface, method))
    }
}
