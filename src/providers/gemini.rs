pub mod model;
pub mod provider;
pub mod utils;

pub use model::*;
pub use provider::GeminiAdapter;
pub use utils::{InlineImage, parse_data_uri};
