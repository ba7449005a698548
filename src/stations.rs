//! Station topology derived from the static stops and transfers tables.
//!
//! A station is a connected component of parent stops over the transfer
//! graph, together with every platform whose `parent_station` is one of
//! those parents.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::gtfs::{Stop, StopId, Transfer};

/// Platforms belonging to one parent stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopFamily {
    pub parent_stop_id: StopId,
    pub children: Vec<StopId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: String,
    /// Taken from the first parent stop; absent when that stop is unknown.
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub parent_stop_ids: Vec<StopId>,
    pub stop_ids: Vec<StopId>,
    pub stop_families: Vec<StopFamily>,
}

/// Disjoint sets over parent stop ids, remembering the order in which each
/// id was first seen.
#[derive(Debug, Default)]
struct DisjointSet {
    index: HashMap<StopId, usize>,
    ids: Vec<StopId>,
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn insert(&mut self, id: &StopId) -> usize {
        if let Some(&i) = self.index.get(id) {
            return i;
        }
        let i = self.ids.len();
        self.index.insert(id.clone(), i);
        self.ids.push(id.clone());
        self.parent.push(i);
        self.rank.push(0);
        i
    }

    fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        // path compression
        let mut node = i;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }

        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }

    /// Components ordered by their earliest-seen member, members in the
    /// order they were first seen.
    fn components(mut self) -> Vec<Vec<StopId>> {
        let mut slot_by_root: HashMap<usize, usize> = HashMap::new();
        let mut components: Vec<Vec<StopId>> = Vec::new();

        for i in 0..self.ids.len() {
            let root = self.find(i);
            let slot = *slot_by_root.entry(root).or_insert_with(|| {
                components.push(Vec::new());
                components.len() - 1
            });
            components[slot].push(self.ids[i].clone());
        }

        components
    }
}

/// Groups parent stops into stations using the transfer graph.
///
/// Output order is fully determined by the order of `transfers` and `stops`.
#[tracing::instrument(skip_all, fields(stops = stops.len(), transfers = transfers.len()))]
pub fn build_stations(stops: &[Stop], transfers: &[Transfer]) -> Vec<Station> {
    let mut sets = DisjointSet::default();
    for transfer in transfers {
        let from = sets.insert(&transfer.from_stop_id);
        let to = sets.insert(&transfer.to_stop_id);
        sets.union(from, to);
    }

    let mut children: HashMap<&StopId, Vec<StopId>> = HashMap::new();
    let mut by_id: HashMap<&StopId, &Stop> = HashMap::new();
    for stop in stops {
        by_id.entry(&stop.stop_id).or_insert(stop);
        if let Some(parent) = &stop.parent_station {
            children.entry(parent).or_default().push(stop.stop_id.clone());
        }
    }

    let stations: Vec<Station> = sets
        .components()
        .into_iter()
        .map(|parent_stop_ids| {
            let stop_families: Vec<StopFamily> = parent_stop_ids
                .iter()
                .map(|parent| StopFamily {
                    parent_stop_id: parent.clone(),
                    children: children.get(parent).cloned().unwrap_or_default(),
                })
                .collect();

            let stop_ids = stop_families
                .iter()
                .flat_map(|family| family.children.iter().cloned())
                .collect();

            let id = parent_stop_ids
                .iter()
                .map(StopId::to_string)
                .collect::<Vec<_>>()
                .join(",");

            let first = parent_stop_ids.first().and_then(|p| by_id.get(p));
            if first.is_none() {
                warn!(station = %id, "First parent stop missing from stops table");
            }

            Station {
                name: first.and_then(|s| s.stop_name.clone()),
                latitude: first.and_then(|s| s.stop_lat),
                longitude: first.and_then(|s| s.stop_lon),
                id,
                parent_stop_ids,
                stop_ids,
                stop_families,
            }
        })
        .collect();

    for station in &stations {
        debug!(
            station = %station.id,
            parents = station.parent_stop_ids.len(),
            platforms = station.stop_ids.len(),
            "Station built"
        );
    }
    info!(stations = stations.len(), "Station topology built");

    stations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolated_transfer_creates_one_station() {
        let stops = vec![parent("A", "Alpha"), parent("B", "Beta")];
        let stations = build_stations(&stops, &[transfer("A", "B")]);

        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].id, "A,B");
        assert_eq!(stations[0].parent_stop_ids, ids(&["A", "B"]));
    }

    #[test]
    fn test_connecting_transfer_merges_partial_clusters() {
        let transfers = vec![transfer("A", "B"), transfer("C", "D"), transfer("B", "C")];
        let stations = build_stations(&[], &transfers);

        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].parent_stop_ids, ids(&["A", "B", "C", "D"]));
    }

    #[test]
    fn test_to_endpoint_joins_existing_station() {
        let transfers = vec![transfer("A", "B"), transfer("C", "B")];
        let stations = build_stations(&[], &transfers);

        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].id, "A,B,C");
    }

    #[test]
    fn test_every_parent_in_exactly_one_station() {
        let transfers = vec![
            transfer("101", "101"),
            transfer("R01", "R02"),
            transfer("A02", "A03"),
            transfer("R02", "R03"),
            transfer("A03", "A02"),
            transfer("X", "R01"),
        ];
        let stations = build_stations(&[], &transfers);

        for t in &transfers {
            for id in [&t.from_stop_id, &t.to_stop_id] {
                let owners = stations
                    .iter()
                    .filter(|s| s.parent_stop_ids.contains(id))
                    .count();
                assert_eq!(owners, 1, "{id} should belong to one station");
            }
        }
        assert_eq!(stations.len(), 3);
        assert_eq!(stations[0].id, "101");
        assert_eq!(stations[1].id, "R01,R02,R03,X");
        assert_eq!(stations[2].id, "A02,A03");
    }

    #[test]
    fn test_families_and_flattened_stop_ids() {
        let stops = vec![
            parent("A", "Alpha"),
            child("AN", "A"),
            child("AS", "A"),
            parent("B", "Beta"),
            child("BN", "B"),
        ];
        let stations = build_stations(&stops, &[transfer("B", "A")]);
        let station = &stations[0];

        assert_eq!(station.stop_families.len(), 2);
        assert_eq!(station.stop_families[0].parent_stop_id, StopId::from("B"));
        assert_eq!(station.stop_families[0].children, ids(&["BN"]));
        assert_eq!(station.stop_families[1].children, ids(&["AN", "AS"]));

        let concatenated: Vec<StopId> = station
            .stop_families
            .iter()
            .flat_map(|f| f.children.clone())
            .collect();
        assert_eq!(station.stop_ids, concatenated);
    }

    #[test]
    fn test_name_and_coordinates_from_first_parent() {
        let stops = vec![parent("A", "Alpha"), parent("B", "Beta")];
        let stations = build_stations(&stops, &[transfer("B", "A")]);

        assert_eq!(stations[0].name.as_deref(), Some("Beta"));
        assert_eq!(stations[0].latitude, Some(40.0));
        assert_eq!(stations[0].longitude, Some(-73.0));
    }

    #[test]
    fn test_unknown_first_parent_leaves_name_absent() {
        let stops = vec![parent("B", "Beta")];
        let stations = build_stations(&stops, &[transfer("ghost", "B")]);

        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].name, None);
        assert_eq!(stations[0].latitude, None);
        assert_eq!(stations[0].stop_families[0].children, Vec::<StopId>::new());
    }

    #[test]
    fn test_build_is_deterministic() {
        let stops = vec![parent("A", "Alpha"), child("AN", "A"), parent("B", "Beta")];
        let transfers = vec![transfer("A", "B"), transfer("C", "D"), transfer("D", "A")];

        let first = serde_json::to_string(&build_stations(&stops, &transfers)).unwrap();
        let second = serde_json::to_string(&build_stations(&stops, &transfers)).unwrap();
        assert_eq!(first, second);
    }

    // Helper functions for tests
    fn ids(raw: &[&str]) -> Vec<StopId> {
        raw.iter().map(|r| StopId::from(*r)).collect()
    }

    fn transfer(from: &str, to: &str) -> Transfer {
        Transfer {
            from_stop_id: StopId::from(from),
            to_stop_id: StopId::from(to),
        }
    }

    fn parent(id: &str, name: &str) -> Stop {
        Stop {
            stop_id: StopId::from(id),
            stop_name: Some(name.to_string()),
            stop_lat: Some(40.0),
            stop_lon: Some(-73.0),
            parent_station: None,
        }
    }

    fn child(id: &str, parent: &str) -> Stop {
        Stop {
            stop_id: StopId::from(id),
            stop_name: None,
            stop_lat: None,
            stop_lon: None,
            parent_station: Some(StopId::from(parent)),
        }
    }
}
