pub mod coldstart;
pub mod decay;
pub mod update;
