use foundation::geo::LonLat;

use crate::{BoxFuture, RouteSegment, RoutingError, RoutingService};

/// Offline router: a straight line between the two stops.
#[derive(Debug, Default, Clone, Copy)]
pub struct StraightLineRouter;

impl RoutingService for StraightLineRouter {
    fn route(&self, from: LonLat, to: LonLat) -> BoxFuture<'_, Result<RouteSegment, RoutingError>> {
        Box::pin(async move { Ok(RouteSegment::new(vec![from, to])) })
    }
}
