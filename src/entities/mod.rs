mod driver;
mod location;
mod quote;
mod ride_option;
mod route;
mod user;

pub use driver::{Driver, Status as DriverStatus, Vehicle};
pub use location::{Coordinates, Location, LocationSource};
pub use quote::{Phase, QuoteEvent, QuoteRequest, QuoteSnapshot, QuoteState};
pub use quote::{MISSING_DROP_MESSAGE, MISSING_PICKUP_MESSAGE};
pub use ride_option::{format_price, mark_unavailable, merge_prices, PricedClass, RideOption};
pub use route::RouteInfo;
pub use user::{NewUser, Role, SessionStatus, SignIn, User};
