//! Proptest strategies for regions and grids.

use geotally::geo::CoordinateBox;
use geotally::regions::SimpleGrid;
use proptest::prelude::*;

/// A valid box anywhere on the globe, between 0.01 and 20 degrees a side
pub fn coordinate_box_strategy() -> impl Strategy<Value = CoordinateBox> {
    (-80.0f64..70.0, -170.0f64..150.0, 0.01f64..10.0, 0.01f64..20.0).prop_map(
        |(min_lat, min_lon, lat_span, lon_span)| {
            CoordinateBox::new(min_lat, min_lon, min_lat + lat_span, min_lon + lon_span)
                .expect("strategy only builds valid boxes")
        },
    )
}

/// A grid with at most a few thousand cells
pub fn simple_grid_strategy() -> impl Strategy<Value = SimpleGrid> {
    coordinate_box_strategy()
        .prop_flat_map(|bounds| {
            let longest = bounds.lat_span().max(bounds.lon_span());
            (Just(bounds), (longest / 40.0)..(longest * 1.5))
        })
        .prop_map(|(bounds, resolution)| {
            SimpleGrid::new(bounds, resolution).expect("strategy only builds valid grids")
        })
}
