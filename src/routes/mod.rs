pub mod ai;
pub mod response;
pub mod survey;
pub mod user;
