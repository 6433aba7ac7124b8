pub mod keyword;
pub mod sample;

pub use keyword::TrackedKeyword;
pub use sample::PerformanceSample;
