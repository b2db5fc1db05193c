//! R-tree indexes used as conservative prefilters.
//!
//! Both indexes only narrow down candidates; the exact kernel test still
//! decides, so results match a full scan.

use rstar::{RTree, RTreeObject, AABB};

use crate::{Bounds, Coordinate, Observation, Region};

impl Bounds {
    /// Envelope for R-tree queries, `[lon, lat]` axis order.
    pub fn to_aabb(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.min_lon, self.min_lat], [self.max_lon, self.max_lat])
    }
}

/// An observation coordinate with its position in the input slice.
#[derive(Debug, Clone, Copy)]
pub struct IndexedObservation {
    pub idx: usize,
    pub lon: f64,
    pub lat: f64,
}

impl RTreeObject for IndexedObservation {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lon, self.lat])
    }
}

/// Spatial index over the valid observations of one run.
pub struct ObservationIndex {
    tree: RTree<IndexedObservation>,
}

impl ObservationIndex {
    /// Bulk-load every observation with a valid WGS84 coordinate.
    pub fn build(observations: &[Observation]) -> Self {
        let indexed: Vec<IndexedObservation> = observations
            .iter()
            .enumerate()
            .filter(|(_, obs)| obs.coord.is_valid())
            .map(|(i, obs)| IndexedObservation {
                idx: i,
                lon: obs.coord.lon,
                lat: obs.coord.lat,
            })
            .collect();
        Self {
            tree: RTree::bulk_load(indexed),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Indices of observations inside `bounds`, ascending.
    pub fn candidates(&self, bounds: &Bounds) -> Vec<usize> {
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope(&bounds.to_aabb())
            .map(|o| o.idx)
            .collect();
        hits.sort_unstable();
        hits
    }
}

/// Bounding box of a region with its position in the region slice.
#[derive(Debug, Clone)]
pub struct RegionEnvelope {
    pub idx: usize,
    pub bounds: Bounds,
}

impl RTreeObject for RegionEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.bounds.to_aabb()
    }
}

/// Spatial index over region envelopes.
pub struct RegionIndex {
    tree: RTree<RegionEnvelope>,
}

impl RegionIndex {
    /// Index the regions whose positions are listed in `usable`.
    pub fn build(regions: &[Region], usable: &[usize]) -> Self {
        let envelopes: Vec<RegionEnvelope> = usable
            .iter()
            .filter_map(|&idx| {
                let bounds = regions.get(idx)?.polygon.bounds()?;
                Some(RegionEnvelope { idx, bounds })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(envelopes),
        }
    }

    /// Indices of regions whose envelope touches `coord`, in input order.
    ///
    /// Input order matters: watershed assignment is first-match-wins.
    pub fn candidates_at(&self, coord: &Coordinate) -> Vec<usize> {
        let probe = AABB::from_point([coord.lon, coord.lat]);
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&probe)
            .map(|r| r.idx)
            .collect();
        hits.sort_unstable();
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Polygon;

    fn box_region(id: &str, min_lon: f64, min_lat: f64, size: f64) -> Region {
        let ring = vec![
            Coordinate::new(min_lon, min_lat),
            Coordinate::new(min_lon + size, min_lat),
            Coordinate::new(min_lon + size, min_lat + size),
            Coordinate::new(min_lon, min_lat + size),
            Coordinate::new(min_lon, min_lat),
        ];
        Region::new(id, id, Polygon::new(ring, vec![]))
    }

    #[test]
    fn test_observation_index_skips_invalid() {
        let observations = vec![
            Observation::new("a", Coordinate::new(0.0, 0.0)),
            Observation::new("b", Coordinate::new(f64::NAN, 0.0)),
            Observation::new("c", Coordinate::new(0.5, 0.5)),
            Observation::new("d", Coordinate::new(200.0, 0.0)),
        ];
        let index = ObservationIndex::build(&observations);
        assert_eq!(index.len(), 2);
        assert!(!index.is_empty());

        let bounds = Bounds::from_coords(&[Coordinate::new(-1.0, -1.0), Coordinate::new(1.0, 1.0)])
            .unwrap();
        assert_eq!(index.candidates(&bounds), vec![0, 2]);
    }

    #[test]
    fn test_region_candidates_keep_input_order() {
        let regions = vec![
            box_region("big", 0.0, 0.0, 10.0),
            box_region("small", 4.0, 4.0, 2.0),
            box_region("far", 50.0, 50.0, 1.0),
        ];
        let index = RegionIndex::build(&regions, &[0, 1, 2]);
        assert_eq!(index.candidates_at(&Coordinate::new(5.0, 5.0)), vec![0, 1]);
        assert!(index.candidates_at(&Coordinate::new(30.0, 30.0)).is_empty());

        let partial = RegionIndex::build(&regions, &[1]);
        assert_eq!(partial.candidates_at(&Coordinate::new(5.0, 5.0)), vec![1]);
    }
}
