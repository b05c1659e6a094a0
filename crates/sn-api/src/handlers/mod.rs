pub mod analysis;
pub mod documents;
pub mod hypotheses;
pub mod ops;
pub mod questions;
pub mod segments;
pub mod sources;
pub mod transcription;
