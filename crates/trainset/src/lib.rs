//! Training dataset construction.
//!
//! Rasters are walked with a sliding window; each window is labeled
//! positive when it overlaps a ground-truth polygon. Per raster, the
//! labeled windows are balanced and split into train, validation and test
//! subsets, then written as JPEG tiles:
//!
//! ```text
//! {output}/
//!   metadata.json
//!   train/{t,f}/{stem}__{row}_{col}.jpg
//!   validation/{t,f}/...
//!   test/{t,f}/...
//! ```

pub mod builder;
pub mod config;
pub mod metadata;
pub mod split;
pub mod writer;

pub use builder::{create_dataset_dirs, raster_seed, BuildSummary, CnnTrainsetBuilder, RasterReport};
pub use config::TrainsetConfig;
pub use metadata::{read_metadata, write_metadata, DatasetMetadata, METADATA_FILE};
pub use split::{split_dataset, ClassPair, DatasetSplit, Subset};
pub use writer::{encode_jpeg, write_tile};
