pub mod constants;
pub mod contract;
pub mod errors;
pub mod managers;
pub mod services;
pub mod utils;

pub use contract::{
    ArgValue, Args, BinaryPart, ContractRegistry, InterfaceContract, MethodContract, MethodId,
    ParamDecl, ParamRole, ReturnShape,
};
pub use errors::{ClientError, ClientErrorKind};
pub use managers::client::{Pending, RestClient, RestClientBuilder};
pub use managers::pipeline::{ActionContext, ActionFilter, Next};
pub use services::response::HttpResult;
pub use services::settings::{ClientSettings, RetryPolicy};
