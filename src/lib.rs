// phishscan: lexical phishing-URL classification.
//
// This is the library root. Each module corresponds to one stage of the
// inference pipeline: features -> scaling -> model -> label -> output.

pub mod artifacts;
pub mod config;
pub mod features;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod scaling;
