pub mod analysis;
pub mod annotate;
pub mod calibration;
pub mod error;
pub mod filters;
pub mod models;
pub mod regions;
pub mod segmentation;
pub mod stats;

pub use analysis::{
    InclusionAnalyzer, MeasurementCore, NodularityAnalyzer, PhaseAnalyzer, PorosityAnalyzer,
    SessionStore,
};
pub use calibration::Calibration;
pub use error::{AnalysisError, Result};
pub use filters::{FilterSpec, Interval, RangeFilter};
pub use models::{Bbox, Candidate, Measurement, Region, Unit};
pub use segmentation::{HsvRange, Segmentation};
