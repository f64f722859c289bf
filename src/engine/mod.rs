pub mod convergence;
pub mod export;
pub mod paths;
pub mod run;
