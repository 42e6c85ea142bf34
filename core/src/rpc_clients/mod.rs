pub mod bundler;
pub mod paymaster;
pub mod transport;

pub use bundler::{BundlerClient, GasPriceTier, UserOperationGasPrice, UseropGasEstimation};
pub use paymaster::{PaymasterClient, PaymasterResultV07};
