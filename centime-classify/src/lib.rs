//! centime-classify: trained text + metadata categorizer, keyword rule
//! fallback, and the user-override store

pub mod categorizer;
pub mod features;
pub mod model;
pub mod overrides;
pub mod rules;

pub use categorizer::{
    AUTO_APPLY_THRESHOLD, CategorizerStatus, Prediction, PredictionSource, SmartCategorizer,
    TrainReport, TrainingExample, categorize_transaction, categorize_with_details,
};
pub use overrides::OverrideStore;
pub use rules::{CATEGORIZATION_RULES, fallback_category};
