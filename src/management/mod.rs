mod credentials;

pub use credentials::CredentialStore;
pub use credentials::FileCredentialStore;
pub use credentials::MemoryCredentialStore;
pub use credentials::StoredEntries;
