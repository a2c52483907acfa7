pub mod scores;
pub mod stream;
pub mod ws;
