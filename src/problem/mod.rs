use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

pub mod network;
pub mod router;

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(LinkId);
string_id!(NodeId);
string_id!(ServiceId);
string_id!(VehicleId);
string_id!(VehicleTypeId);

pub type Capacity = u32;

/// A delivery request at a fixed link.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub location: LinkId,
    pub capacity_demand: Capacity,
    #[serde(default)]
    pub service_duration: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleType {
    pub id: VehicleTypeId,
    pub capacity: Capacity,
    #[serde(default)]
    pub cost_per_distance: f64,
    #[serde(default)]
    pub cost_per_time: f64,
    #[serde(default)]
    pub fixed_cost: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Vehicle {
    pub id: VehicleId,
    pub vehicle_type: VehicleType,
    pub depot: LinkId,
    pub earliest_start: f64,
    pub latest_end: f64,
}

impl Vehicle {
    pub fn capacity(&self) -> Capacity {
        self.vehicle_type.capacity
    }

    pub fn type_id(&self) -> &VehicleTypeId {
        &self.vehicle_type.id
    }
}

/// The company whose services are planned. Shared read-only by every plan copy.
#[derive(Clone, Debug)]
pub struct Carrier {
    pub id: String,
    pub depot: LinkId,
    pub operating_hours: (f64, f64),
    services: Vec<Service>,
    service_index: HashMap<ServiceId, usize>,
    vehicle_types: Vec<VehicleType>,
}

impl Carrier {
    pub fn new(
        id: impl Into<String>,
        depot: LinkId,
        operating_hours: (f64, f64),
        services: Vec<Service>,
        vehicle_types: Vec<VehicleType>,
    ) -> Self {
        let service_index = services
            .iter()
            .enumerate()
            .map(|(idx, service)| (service.id.clone(), idx))
            .collect();
        Self {
            id: id.into(),
            depot,
            operating_hours,
            services,
            service_index,
            vehicle_types,
        }
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn service(&self, id: &ServiceId) -> Option<&Service> {
        self.service_index.get(id).map(|&idx| &self.services[idx])
    }

    /// Position of the service in the carrier's catalog, used for bitset bookkeeping.
    pub fn service_index(&self, id: &ServiceId) -> Option<usize> {
        self.service_index.get(id).cloned()
    }

    pub fn vehicle_types(&self) -> &[VehicleType] {
        &self.vehicle_types
    }

    pub fn vehicle_type(&self, id: &VehicleTypeId) -> Option<&VehicleType> {
        self.vehicle_types.iter().find(|it| &it.id == id)
    }
}
