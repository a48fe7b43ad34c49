pub mod balance;
pub mod dataset;
pub mod image;
pub mod io;
pub mod labels;
pub mod normalize;
pub mod patches;

pub use balance::{balance_classes, class_counts};
pub use dataset::{Dataset, DatasetOptions, ImagePair, Split};
pub use image::Image;
pub use labels::{ForegroundScore, Label, LabelAssigner};
pub use normalize::{normalize_per_channel, ChannelStats};
pub use patches::{extract_patches, Patch, Patches};
