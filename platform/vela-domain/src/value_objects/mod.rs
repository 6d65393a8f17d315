pub mod account;
pub mod bar;
pub mod decision;
pub mod order;
pub mod portfolio_point;
pub mod round_trip;
pub mod side;
pub mod signal;
