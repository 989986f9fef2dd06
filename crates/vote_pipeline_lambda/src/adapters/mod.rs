pub mod bus;
pub mod clients;
pub mod dynamodb;
pub mod store;
