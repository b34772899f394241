use crate::problem::network::{Link, LinkNetwork};
use crate::problem::{Capacity, Carrier, LinkId, Service, Vehicle, VehicleId, VehicleType};

const GRID_LINK_LENGTH: f64 = 100.0;
const GRID_FREESPEED: f64 = 10.0;

// reachable in every grid with at least three nodes per side
const SERVICE_LOCATIONS: [&str; 8] = [
    "h_1_0", "v_2_0", "h_1_2", "vr_0_1", "h_0_1", "v_1_1", "hr_0_2", "v_0_0",
];

/// Bidirectional `size` x `size` grid. `h_x_y` runs from node (x,y) to (x+1,y), `v_x_y` from
/// (x,y) to (x,y+1); `hr_`/`vr_` are the reverse directions.
pub fn grid_network(size: usize) -> LinkNetwork {
    let node = |x: usize, y: usize| format!("n_{}_{}", x, y);
    let link = |id: String, from: String, to: String| Link {
        id: LinkId(id),
        from: from.into(),
        to: to.into(),
        length: GRID_LINK_LENGTH,
        freespeed: GRID_FREESPEED,
    };

    let mut links = vec![];
    for x in 0..size {
        for y in 0..size {
            if x + 1 < size {
                links.push(link(format!("h_{}_{}", x, y), node(x, y), node(x + 1, y)));
                links.push(link(format!("hr_{}_{}", x, y), node(x + 1, y), node(x, y)));
            }
            if y + 1 < size {
                links.push(link(format!("v_{}_{}", x, y), node(x, y), node(x, y + 1)));
                links.push(link(format!("vr_{}_{}", x, y), node(x, y + 1), node(x, y)));
            }
        }
    }
    LinkNetwork::new(links).expect("grid network is valid")
}

pub fn service(id: &str, location: &str, demand: Capacity) -> Service {
    Service {
        id: id.into(),
        location: location.into(),
        capacity_demand: demand,
        service_duration: 60.0,
    }
}

pub fn light_vehicle_type(capacity: Capacity) -> VehicleType {
    VehicleType {
        id: "light".into(),
        capacity,
        cost_per_distance: 0.0,
        cost_per_time: 0.0,
        fixed_cost: 0.0,
    }
}

pub fn heavy_vehicle_type(capacity: Capacity) -> VehicleType {
    VehicleType {
        id: "heavy".into(),
        capacity,
        cost_per_distance: 0.001,
        cost_per_time: 0.01,
        fixed_cost: 100.0,
    }
}

/// Carrier with a single vehicle type; services are spread over the links of a 3x3 grid.
pub fn single_type_carrier(capacity: Capacity, services: &[(&str, Capacity)]) -> Carrier {
    Carrier::new(
        "carrier",
        "h_0_0".into(),
        (0.0, 86_400.0),
        services
            .iter()
            .enumerate()
            .map(|(idx, (id, demand))| {
                service(id, SERVICE_LOCATIONS[idx % SERVICE_LOCATIONS.len()], *demand)
            })
            .collect(),
        vec![light_vehicle_type(capacity)],
    )
}

/// Carrier with a light (10) and a heavy (30) vehicle type and six services on a 3x3 grid.
pub fn grid_carrier() -> Carrier {
    Carrier::new(
        "carrier",
        "h_0_0".into(),
        (0.0, 86_400.0),
        vec![
            service("s1", "h_0_0", 3),
            service("s2", "v_2_0", 4),
            service("s3", "h_1_2", 2),
            service("s4", "vr_0_1", 5),
            service("s5", "h_0_1", 3),
            service("s6", "v_1_1", 4),
        ],
        vec![light_vehicle_type(10), heavy_vehicle_type(30)],
    )
}

pub fn vehicle(carrier: &Carrier, idx: usize) -> Vehicle {
    Vehicle {
        id: VehicleId(format!("v{}", idx)),
        vehicle_type: carrier.vehicle_types()[0].clone(),
        depot: carrier.depot.clone(),
        earliest_start: carrier.operating_hours.0,
        latest_end: carrier.operating_hours.1,
    }
}

pub fn vehicle_of_type(carrier: &Carrier, type_id: &str, idx: usize) -> Vehicle {
    let vehicle_type = carrier
        .vehicle_type(&type_id.into())
        .expect("vehicle type exists")
        .clone();
    Vehicle {
        id: VehicleId(format!("{}_v{}", type_id, idx)),
        vehicle_type,
        depot: carrier.depot.clone(),
        earliest_start: carrier.operating_hours.0,
        latest_end: carrier.operating_hours.1,
    }
}
