pub mod bitreader;
pub mod error;
pub mod hashing;
pub mod monotone_list;
pub mod recsplit;
pub mod settings;
pub mod xorfilter;

#[cfg(test)]
mod test_support;

pub use error::{RecSplitError, Result};
pub use recsplit::RecSplitEvaluator;
pub use settings::Settings;
pub use xorfilter::XorFilter8;
