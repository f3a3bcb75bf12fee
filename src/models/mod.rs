pub mod configmodels;
pub mod errormodels;
pub mod headermodels;
