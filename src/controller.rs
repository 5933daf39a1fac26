mod redirect;
mod subscriptions;

pub use redirect::{InboundRequest, Page, Pages, Redirect};
pub use subscriptions::{Policy, Routes, Subscriptions};
