pub mod calls;
pub mod checkout;
pub mod health;
