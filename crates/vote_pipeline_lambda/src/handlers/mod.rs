pub mod http;
pub mod intake;
pub mod processor;
pub mod results;
pub mod router;
