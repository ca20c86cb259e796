//! Ubuntu Core base series
//!
//! Maps the base-image series argument to its Ubuntu release, its Launchpad
//! recipe and the package indexes its content is pulled from.

use std::fmt;

/// Base-image series known to the base workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreSeries {
    /// The original `core` snap, released as the 16 series
    Core16,
    Core18,
    Core20,
    Core22,
    Core24,
}

/// Packages built by the core20/core22 snaps themselves rather than pulled
/// from an archive
pub const BUILT_BY_SNAP: &[&str] = &[
    "console-conf",
    "probert-common",
    "probert-network",
    "subiquitycore",
];

/// A remote package index and the local file name it is stored under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSource {
    pub url: String,
    pub file_name: String,
}

impl CoreSeries {
    pub const ALL: [CoreSeries; 5] = [
        Self::Core16,
        Self::Core18,
        Self::Core20,
        Self::Core22,
        Self::Core24,
    ];

    /// Parse the command-line series argument (`""`, `"18"`, ...)
    pub fn from_arg(arg: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|series| series.arg() == arg)
    }

    /// The command-line spelling; the empty string is the 16 series
    pub fn arg(&self) -> &'static str {
        match self {
            Self::Core16 => "",
            Self::Core18 => "18",
            Self::Core20 => "20",
            Self::Core22 => "22",
            Self::Core24 => "24",
        }
    }

    /// Comma separated list of supported arguments, for diagnostics
    pub fn supported_args() -> String {
        Self::ALL
            .iter()
            .map(|s| s.arg())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn version(&self) -> u32 {
        match self {
            Self::Core16 => 16,
            Self::Core18 => 18,
            Self::Core20 => 20,
            Self::Core22 => 22,
            Self::Core24 => 24,
        }
    }

    /// Ubuntu release codename
    pub fn codename(&self) -> &'static str {
        match self {
            Self::Core16 => "xenial",
            Self::Core18 => "bionic",
            Self::Core20 => "focal",
            Self::Core22 => "jammy",
            Self::Core24 => "noble",
        }
    }

    /// Snap name, e.g. `core22`
    pub fn snap_name(&self) -> String {
        format!("core{}", self.arg())
    }

    /// Recipe path below the API root
    pub fn recipe_path(&self) -> String {
        match self {
            Self::Core16 => "~snappy-dev/+snap/core".to_string(),
            _ => format!("~ubuntu-core-service/+snap/{}", self.snap_name()),
        }
    }

    /// PPAs that feed packages into this base
    pub fn ppas(&self) -> Vec<&'static str> {
        let version = self.version();
        let mut ppas = Vec::new();
        if version == 20 || version == 22 {
            ppas.push("ucdev/base-ppa");
        }
        if version == 22 {
            ppas.push("ubuntu-security/fde-ice");
        }
        if version == 16 || version >= 24 {
            ppas.push("snappy-dev/image");
        }
        ppas
    }

    /// Whether [`BUILT_BY_SNAP`] packages are exempt from drift checks
    pub fn excludes_snap_built_packages(&self) -> bool {
        matches!(self, Self::Core20 | Self::Core22)
    }

    /// Every amd64 package index the base is assembled from
    ///
    /// Archive pockets and components first, then ESM, then PPAs.
    pub fn index_sources(&self) -> Vec<IndexSource> {
        let series = self.codename();
        let mut sources = Vec::new();

        for suite in ["", "-updates", "-security"] {
            for component in ["main", "restricted", "universe", "multiverse"] {
                sources.push(IndexSource {
                    url: format!(
                        "http://archive.ubuntu.com/ubuntu/dists/{series}{suite}/{component}/binary-amd64/Packages.gz"
                    ),
                    file_name: [series, suite, component, "packages.gz"].join("-"),
                });
            }
        }

        for category in ["infra", "apps"] {
            for pocket in ["security", "updates"] {
                let suite = format!("{series}-{category}-{pocket}");
                sources.push(IndexSource {
                    url: format!(
                        "https://esm.ubuntu.com/{category}/ubuntu/dists/{suite}/main/binary-amd64/Packages.gz"
                    ),
                    file_name: format!("{suite}-packages.gz"),
                });
            }
        }

        for ppa in self.ppas() {
            sources.push(IndexSource {
                url: format!(
                    "https://ppa.launchpadcontent.net/{ppa}/ubuntu/dists/{series}/main/binary-amd64/Packages.gz"
                ),
                file_name: format!("{}-packages.gz", ppa.replace('/', "-")),
            });
        }

        sources
    }
}

impl fmt::Display for CoreSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.snap_name())
    }
}

/// Ubuntu release a snap base builds on
pub fn series_for_base(base: &str) -> &'static str {
    match base {
        "core24" => "noble",
        "core22" => "jammy",
        "core20" => "focal",
        "core18" => "bionic",
        _ => "xenial",
    }
}

/// Snapcraft channel used when none is requested
///
/// Snapcraft 6 dropped i386, which core18 still publishes for.
pub fn default_snapcraft_channel(series: &str) -> &'static str {
    match series {
        "xenial" => "4.x/stable",
        "bionic" => "5.x/stable",
        _ => "latest/stable",
    }
}
