//! Location fusion: best-fix selection across providers.

mod fuser;
mod processor;

pub use fuser::{
    best_of, is_better, Fix, FuserConfig, DEFAULT_ACCURACY_THRESHOLD_METERS,
    DEFAULT_EXPIRATION_SECONDS,
};
pub use processor::{LocationProcessor, LocationRequest};
