pub mod backend;
pub mod link_store;
pub mod models;
pub mod option_store;

pub use backend::LinkDatabase;
pub use link_store::LinkStore;
pub use models::{ClickUpdate, LinkRecord, LinkStats, OptionValue, SortField, SortOrder};
pub use option_store::{OptionStore, deserialize_option_value, serialize_option_value};
