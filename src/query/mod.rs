pub mod classifier;

pub use classifier::{
    classify, classify_query, extract_target_term, lookup_direction, CardType, ClassifiedQuery,
    LookupDirection, QueryClass,
};
