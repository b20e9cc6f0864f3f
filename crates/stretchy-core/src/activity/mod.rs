mod model;
mod pages;

pub use model::{Activity, ActivitySequence, ActivityType, SkipDirection};
pub use pages::{DisplayPage, MergedPage, PageMap, RawIndex};
