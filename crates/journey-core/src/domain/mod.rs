//! Domain model (IDs, routes, events, errors).

pub mod errors;
pub mod events;
pub mod ids;
pub mod route;

pub use self::errors::CacheError;
pub use self::events::RouteEvent;
pub use self::ids::{ActorId, LocationId, RouteKey};
pub use self::route::{ActorJourney, Point, Route, RouteView};
