pub mod change_notifier;
pub mod connectivity;
pub mod credentials;
pub mod local_store;
pub mod remote_api;

pub use change_notifier::ChangeNotifier;
pub use connectivity::Connectivity;
pub use credentials::CredentialProvider;
pub use local_store::{LocalStore, ReconcileOutcome, RecordFilter};
pub use remote_api::{CollectionScope, RemoteApi, RemoteError};
