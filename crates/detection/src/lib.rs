//! Sliding-window inference.
//!
//! Each raster is walked with the window size the classifier was trained
//! on. Tiles are rescaled with the raster's global intensity percentiles,
//! normalized with the model's [`Preprocessing`], scored in batches through
//! a [`Classifier`], and windows scoring above the threshold become WGS84
//! detections carrying a `prob` property.

pub mod checkpoint;
pub mod classifier;
pub mod config;
pub mod predict;
pub mod preprocess;

pub use checkpoint::{checkpoint_path, load_checkpoint, save_checkpoint};
pub use classifier::{Classifier, HttpClassifier};
pub use config::DetectConfig;
pub use predict::{predict_raster, predict_rasters, PredictReport};
pub use preprocess::{Preprocessing, Tile};
