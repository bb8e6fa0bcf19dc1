pub mod component;
pub mod format;
pub mod inline;
pub mod outline;
pub mod parser;
pub mod section;
pub mod validate;

pub use component::{ComponentBody, ComponentType, ContentComponent, ContentRef};
pub use format::Format;
pub use outline::{Location, Outline, SourceMap};
pub use section::Section;
