mod socket;

pub use socket::{BoxSocket, Socket};
