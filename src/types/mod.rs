pub mod cv_data;
pub mod response;

pub use cv_data::{Cv, CvInput, CvPatch, FieldErrors, Project, ProjectInput};
pub use response::{ChatCompletionResponse, TranslatableContent, TranslationResult};
