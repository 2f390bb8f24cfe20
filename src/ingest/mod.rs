/// Input side of the service.
///
/// Submodules:
/// - `dataset`: reads the labelled historical readings used for training.

pub mod dataset;
