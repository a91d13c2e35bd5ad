pub mod paginate;
pub mod slack;
pub mod transport;

pub use paginate::PageRequest;
pub use slack::SlackClient;
pub use transport::{HttpSender, RawResponse, ReqwestSender, Transport};
