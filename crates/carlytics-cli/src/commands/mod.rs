pub mod check;
pub mod reports;
pub mod run;
