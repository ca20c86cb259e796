//! Distribution, archive and people lookups

use lpci_core::dto::snap::{DistroSeries, Processor};

use crate::error::Result;
use crate::{LaunchpadClient, NamedArgs};

/// Distribution every build targets
const DISTRIBUTION: &str = "ubuntu";

impl LaunchpadClient {
    /// Look up a processor such as `amd64`
    pub async fn processor_by_name(&self, name: &str) -> Result<Processor> {
        let args = NamedArgs::op("getByName").text("name", name);
        let response = self.named_get("+processors", &args).send().await?;

        self.handle_response(response).await
    }

    /// Get an Ubuntu series by codename, e.g. `jammy`
    pub async fn distro_series(&self, codename: &str) -> Result<DistroSeries> {
        self.get_object(&format!("{DISTRIBUTION}/{codename}")).await
    }

    /// Link of an architecture of an Ubuntu series
    pub fn distro_arch_series_link(&self, codename: &str, arch: &str) -> String {
        self.resolve(&format!("{DISTRIBUTION}/{codename}/{arch}"))
    }

    /// Link of the Ubuntu primary archive
    pub fn primary_archive_link(&self) -> String {
        self.resolve(&format!("{DISTRIBUTION}/+archive/primary"))
    }

    /// Link of a person or team, e.g. `snappy-hwe-team`
    pub fn person_link(&self, name: &str) -> String {
        self.resolve(&format!("~{}", name.trim_start_matches('~')))
    }
}
