pub mod balance;
pub mod caip;
pub mod checkout;
pub mod error;
pub mod positions;
pub mod registry;
pub mod simulation;
pub mod validator;
