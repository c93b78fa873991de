pub mod error;
pub mod inference;
pub mod similarity;
pub mod storage;
pub mod types;

pub use error::Error;
pub use inference::InferenceModel;
pub use similarity::cosine_similarity;
pub use storage::DocumentStore;
pub use types::{Document, DocumentKind, Item, ItemKind, StoryCategory, UserProfile};

pub type Result<T> = std::result::Result<T, Error>;

/// Embedding width shared by every backend and model in the workspace.
pub const DEFAULT_VECTOR_SIZE: u64 = 768;
