pub mod difficulty;
pub mod recommend;
pub mod selector;
