pub mod chain;
pub mod db;
pub mod ipfs;

pub use chain::InProcessLedger;
pub use db::DbAdapter;
pub use ipfs::InMemoryMetadataStore;
