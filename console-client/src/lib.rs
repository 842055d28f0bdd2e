pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod hooks;
pub mod pipeline;

pub use app::ConsoleState;
pub use config::{ConsoleConfig, Endpoints};
pub use data::{DataService, DataSource, RemoteSource, SubstituteSource};
pub use error::{ApiError, ApiResult};
pub use hooks::{LoginRedirect, UnauthorizedHook};
pub use pipeline::{ApiClient, FileUpload, RequestBody};
