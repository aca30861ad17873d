pub mod coordinates;
pub mod opening_hours;
pub mod poi;
pub mod route;

pub use coordinates::Coordinates;
pub use opening_hours::{day_name, DayHours, DaySummary, OpeningHours, TimeRange};
pub use poi::{Poi, PoiCategory};
pub use route::{
    ConfirmReplaceRequest, ReplaceFullRouteRequest, ReplacePoiRequest, ReplacePoiResponse,
    ReplacementCandidate, Route, RouteStop, SearchRoutesRequest, SearchRoutesResponse,
    SpatialInfo, TimingBreakdown, TransportMode, VisitedPoisRequest,
};
