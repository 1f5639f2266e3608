pub mod embed;
pub mod pair;
pub mod rules;
