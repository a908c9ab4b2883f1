pub mod evaluation;

pub use evaluation::{
    CarbonInputs, CompanyProfile, Evaluation, EvaluationError, FuelInputs, RepProduct,
    WasteInputs, WaterBasis, WaterInputs,
};
