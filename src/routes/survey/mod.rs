pub mod handler;
pub mod model;

pub use handler::{
    analyze_detailed, analyze_survey, answerable_surveys, answered_surveys, create_survey,
    delete_survey, get_results, get_survey, inactive_surveys, my_surveys, public_surveys,
    update_status,
};
