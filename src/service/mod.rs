//! Entity services and link management. Handlers talk to these, never to the
//! store directly.

mod clients;
mod delivery_points;
mod links;

pub use clients::ClientService;
pub use delivery_points::DeliveryPointService;
pub use links::{
    ClientLinks, ClientsOfDeliveryPoint, DeliveryPointLinks, DeliveryPointsOfClient, LinkManager,
    LinkView,
};
