pub mod db;
pub mod identity;
pub mod memory;

pub use db::DbAdapter;
pub use identity::SupabaseIdentityAdapter;
pub use memory::{MemoryStore, StaticIdentity};
