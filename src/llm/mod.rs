pub mod openai;
mod scrub;
pub mod traits;

pub use openai::OpenAiProvider;
pub use scrub::{api_error, sanitize_api_error};
pub use traits::Provider;
