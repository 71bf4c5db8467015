// Feature extraction — trait-based abstraction for swappable extractors.
//
// The FeatureExtractor trait defines the interface. LexicalFeatureExtractor
// implements it from the URL string alone (no DNS, no HTTP fetch).

pub mod lexical;
pub mod traits;
