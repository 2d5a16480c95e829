mod notification;
mod status;
mod stock;

pub use notification::*;
pub use status::*;
pub use stock::*;
