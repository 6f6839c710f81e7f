pub mod gateway;
pub mod media;

pub use gateway::{AcquireError, PermissionGateway};
pub use media::MediaProvider;
