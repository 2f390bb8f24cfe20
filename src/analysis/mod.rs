/// Statistical modelling for the water disease risk service.
///
/// The model is intentionally simple: one global linear fit over the four
/// water-quality features, retrained wholesale from the historical dataset.
///
/// Submodules:
/// - `regression`: ordinary least squares fit and prediction.

pub mod regression;
