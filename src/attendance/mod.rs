pub mod classifier;
pub mod command;
pub mod error;
pub mod machine;
pub mod qr;
pub mod query;
pub mod store;

#[cfg(test)]
pub mod testing;
