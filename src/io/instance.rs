use std::rc::Rc;

use anyhow::{bail, Context};
use log::info;

use crate::construction::{first_fit_plan, plan_from_assignment, VehicleRule};
use crate::plan::TourPlan;
use crate::problem::network::LinkNetwork;
use crate::problem::{Carrier, LinkId, ServiceId, VehicleTypeId};

mod toml {
    use std::fs::File;
    use std::io::Read;

    use serde::Deserialize;

    use crate::problem::network::Link;
    use crate::problem::{Service, VehicleType};

    #[derive(Debug, Deserialize)]
    pub struct Config {
        pub carrier: Carrier,
        pub links: Vec<Link>,
        pub vehicle_types: Vec<VehicleType>,
        pub services: Vec<Service>,
        pub initial_plan: Vec<Tour>,
        #[serde(default)]
        pub reference_plan: Vec<Tour>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Carrier {
        pub id: String,
        pub depot: String,
        #[serde(default = "default_operating_hours")]
        pub operating_hours: (f64, f64),
    }

    #[derive(Debug, Deserialize)]
    pub struct Tour {
        pub vehicle_type: String,
        pub services: Vec<String>,
    }

    fn default_operating_hours() -> (f64, f64) {
        (0.0, 24.0 * 3600.0)
    }

    pub fn read_config(path: impl Into<String>) -> anyhow::Result<Config> {
        let mut s = String::new();
        File::open(path.into())?.read_to_string(&mut s)?;
        parse_config(s.as_str())
    }

    pub fn parse_config(s: &str) -> anyhow::Result<Config> {
        Ok(toml::from_str(s)?)
    }
}

/// Everything a calibration run needs: the carrier, its network and the two plans.
/// Plans are returned unrouted.
pub struct CalibrationInstance {
    pub name: String,
    pub carrier: Rc<Carrier>,
    pub network: LinkNetwork,
    pub initial_plan: TourPlan,
    pub reference_plan: TourPlan,
}

pub fn load_instance(path: impl Into<String>) -> anyhow::Result<CalibrationInstance> {
    let path = path.into();
    let config =
        toml::read_config(path.clone()).with_context(|| format!("reading instance {}", path))?;
    let name = std::path::Path::new(path.as_str())
        .file_stem()
        .map(|it| it.to_string_lossy().to_string())
        .unwrap_or_else(|| path.clone());
    build_instance(name, config)
}

pub fn parse_instance(name: impl Into<String>, s: &str) -> anyhow::Result<CalibrationInstance> {
    build_instance(name.into(), toml::parse_config(s)?)
}

fn build_instance(name: String, config: toml::Config) -> anyhow::Result<CalibrationInstance> {
    let network = LinkNetwork::new(config.links).context("building the network")?;

    let depot = LinkId::from(config.carrier.depot);
    if network.link(&depot).is_none() {
        bail!("depot {} is not a link of the network", depot);
    }
    for service in config.services.iter() {
        if network.link(&service.location).is_none() {
            bail!(
                "service {} is located on unknown link {}",
                service.id,
                service.location
            );
        }
    }
    if config.vehicle_types.is_empty() {
        bail!("carrier {} has no vehicle types", config.carrier.id);
    }

    let carrier = Rc::new(Carrier::new(
        config.carrier.id,
        depot,
        config.carrier.operating_hours,
        config.services,
        config.vehicle_types,
    ));

    let assignment = |tours: Vec<toml::Tour>| -> Vec<(VehicleTypeId, Vec<ServiceId>)> {
        tours
            .into_iter()
            .map(|it| {
                (
                    VehicleTypeId::from(it.vehicle_type),
                    it.services.into_iter().map(ServiceId::from).collect(),
                )
            })
            .collect()
    };

    let initial_plan = plan_from_assignment(carrier.clone(), &assignment(config.initial_plan))
        .context("building the initial plan")?;
    let reference_plan = if config.reference_plan.is_empty() {
        info!("no reference plan given, packing services first-fit into the largest vehicles");
        first_fit_plan(carrier.clone(), carrier.services(), VehicleRule::Largest)
            .context("building the reference plan")?
    } else {
        plan_from_assignment(carrier.clone(), &assignment(config.reference_plan))
            .context("building the reference plan")?
    };

    info!(
        "instance {}: {} links, {} services, {} vehicle types",
        name,
        network.num_links(),
        carrier.services().len(),
        carrier.vehicle_types().len()
    );

    Ok(CalibrationInstance {
        name,
        carrier,
        network,
        initial_plan,
        reference_plan,
    })
}
