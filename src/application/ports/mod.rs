pub mod connectivity;
pub mod file_staging;
pub mod local_store;
pub mod remote_gateway;

pub use connectivity::ConnectivityProbe;
pub use file_staging::{FileStaging, StagedFile};
pub use local_store::LocalStore;
pub use remote_gateway::{FailureClass, RemoteError, RemoteGateway};
