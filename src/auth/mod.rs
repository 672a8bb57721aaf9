/*!
 * Auth Module
 * Authenticator and storage handler contracts with demo implementations
 */

pub mod demo;
pub mod registry;
pub mod traits;
pub mod types;

pub use demo::{DemoAuthenticator, MemoryStorage};
pub use registry::{AuthenticatorFactory, HandlerRegistry, Handlers, StorageFactory};
pub use traits::{Authenticator, StorageHandler};
pub use types::{AuthError, AuthResult, Credentials, LoginResponse, UserData};
