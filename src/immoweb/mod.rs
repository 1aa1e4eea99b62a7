pub mod helpers;
pub mod selectors;
