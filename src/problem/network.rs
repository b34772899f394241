use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{CalibrationError, Result};
use crate::problem::{LinkId, NodeId, VehicleType};

pub trait Network {
    fn link_length(&self, link: &LinkId) -> Result<f64>;
}

#[derive(Clone, Debug, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub from: NodeId,
    pub to: NodeId,
    pub length: f64,
    pub freespeed: f64,
}

impl Link {
    /// Free-flow travel time in seconds.
    pub fn travel_time(&self) -> f64 {
        self.length / self.freespeed
    }

    pub fn travel_disutility(&self, vehicle_type: &VehicleType) -> f64 {
        vehicle_type.cost_per_distance * self.length
            + vehicle_type.cost_per_time * self.travel_time()
    }
}

/// Directed link graph with per-link length and free speed.
#[derive(Debug)]
pub struct LinkNetwork {
    links: Vec<Link>,
    link_index: HashMap<LinkId, usize>,
    outgoing: HashMap<NodeId, Vec<usize>>,
}

impl LinkNetwork {
    pub fn new(links: Vec<Link>) -> Result<Self> {
        let mut link_index = HashMap::with_capacity(links.len());
        let mut outgoing: HashMap<NodeId, Vec<usize>> = HashMap::new();
        for (idx, link) in links.iter().enumerate() {
            if !(link.freespeed > 0.0) {
                return Err(CalibrationError::InvalidNetwork(format!(
                    "link {} has non-positive free speed {}",
                    link.id, link.freespeed
                )));
            }
            if link.length < 0.0 {
                return Err(CalibrationError::InvalidNetwork(format!(
                    "link {} has negative length {}",
                    link.id, link.length
                )));
            }
            if link_index.insert(link.id.clone(), idx).is_some() {
                return Err(CalibrationError::InvalidNetwork(format!(
                    "duplicate link {}",
                    link.id
                )));
            }
            outgoing.entry(link.from.clone()).or_default().push(idx);
        }
        Ok(Self {
            links,
            link_index,
            outgoing,
        })
    }

    pub fn link(&self, id: &LinkId) -> Option<&Link> {
        self.link_index.get(id).map(|&idx| &self.links[idx])
    }

    pub fn link_at(&self, idx: usize) -> &Link {
        &self.links[idx]
    }

    /// Outgoing links of `node` together with their index.
    pub fn outgoing_links(&self, node: &NodeId) -> impl Iterator<Item=(usize, &Link)> {
        self.outgoing
            .get(node)
            .into_iter()
            .flat_map(|it| it.iter().map(|&idx| (idx, &self.links[idx])))
    }

    pub fn num_links(&self) -> usize {
        self.links.len()
    }
}

impl Network for LinkNetwork {
    fn link_length(&self, link: &LinkId) -> Result<f64> {
        self.link(link)
            .map(|it| it.length)
            .ok_or_else(|| CalibrationError::UnknownLink(link.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(id: &str, from: &str, to: &str, length: f64, freespeed: f64) -> Link {
        Link {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            length,
            freespeed,
        }
    }

    #[test]
    fn link_lengths_are_looked_up() -> anyhow::Result<()> {
        let network = LinkNetwork::new(vec![
            link("a", "1", "2", 100.0, 10.0),
            link("b", "2", "3", 250.0, 10.0),
        ])?;
        assert_eq!(network.link_length(&"b".into())?, 250.0);
        assert!(matches!(
            network.link_length(&"c".into()),
            Err(CalibrationError::UnknownLink(_))
        ));
        assert_eq!(network.outgoing_links(&"2".into()).count(), 1);
        assert_eq!(network.outgoing_links(&"3".into()).count(), 0);
        Ok(())
    }

    #[test]
    fn non_positive_freespeed_is_rejected() {
        let res = LinkNetwork::new(vec![link("a", "1", "2", 100.0, 0.0)]);
        assert!(matches!(res, Err(CalibrationError::InvalidNetwork(_))));
    }

    #[test]
    fn travel_disutility_combines_distance_and_time() {
        let l = link("a", "1", "2", 100.0, 10.0);
        let vehicle_type = VehicleType {
            id: "light".into(),
            capacity: 10,
            cost_per_distance: 0.5,
            cost_per_time: 2.0,
            fixed_cost: 0.0,
        };
        assert_eq!(l.travel_time(), 10.0);
        assert_eq!(l.travel_disutility(&vehicle_type), 50.0 + 20.0);
    }
}
