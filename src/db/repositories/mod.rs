mod keywords;
mod samples;

pub use samples::{BucketedPosition, RepresentativePosition, VolumeAggregate};
