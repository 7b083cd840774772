pub mod feed;
pub mod remote;
pub mod traits;
