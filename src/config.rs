// config.rs — Run configuration for the gallery demos.
//
// A plain struct with defaults; `from_env` overlays environment variables:
//
//   STENCIL_BACKEND     gpu | cpu
//   STENCIL_PROFILE     native | rpi
//   STENCIL_SCALE       upscale factor (positive integer)
//   STENCIL_ZOOM        nearest-neighbour display zoom (positive integer)
//   STENCIL_REFERENCE   include the pyrUp reference: 1/0, true/false
//   STENCIL_ORIGINAL    lead the filter gallery with the source image
//   STENCIL_WORKGROUP   workgroup override, e.g. 16x8

use std::env;
use std::fmt;
use std::str::FromStr;

use crate::convolution::ScaleFactor;
use crate::error::{Result, StencilError};
use crate::gpu::device::{DeviceProfile, WorkgroupSize};

/// Where dispatches run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Gpu,
    Cpu,
}

impl FromStr for BackendKind {
    type Err = StencilError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gpu" => Ok(BackendKind::Gpu),
            "cpu" => Ok(BackendKind::Cpu),
            other => Err(StencilError::Config(format!("unknown backend `{other}`"))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Gpu => write!(f, "gpu"),
            BackendKind::Cpu => write!(f, "cpu"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GalleryConfig {
    /// Execution backend.
    pub backend: BackendKind,
    /// Device limits profile (GPU backend only).
    pub profile: DeviceProfile,
    /// Upscale factor for the upscaling gallery.
    pub scale_factor: u32,
    /// Display zoom applied when showing results.
    pub display_zoom: usize,
    /// Prepend the host pyrUp reference to the upscaling gallery.
    pub include_pyr_up_reference: bool,
    /// Prepend the unfiltered source to the filter gallery.
    pub include_original: bool,
    /// Workgroup size override `(x, y)`; `None` keeps the profile default.
    pub workgroup: Option<(u32, u32)>,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        GalleryConfig {
            backend: BackendKind::Gpu,
            profile: DeviceProfile::Native,
            scale_factor: 2,
            display_zoom: 4,
            include_pyr_up_reference: true,
            include_original: true,
            workgroup: None,
        }
    }
}

impl GalleryConfig {
    /// Defaults overlaid with `STENCIL_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for each key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = GalleryConfig::default();
        if let Some(v) = lookup("STENCIL_BACKEND") {
            cfg.backend = v.parse()?;
        }
        if let Some(v) = lookup("STENCIL_PROFILE") {
            cfg.profile = parse_profile(&v)?;
        }
        if let Some(v) = lookup("STENCIL_SCALE") {
            cfg.scale_factor = parse_number("STENCIL_SCALE", &v)?;
        }
        if let Some(v) = lookup("STENCIL_ZOOM") {
            cfg.display_zoom = parse_number("STENCIL_ZOOM", &v)?;
        }
        if let Some(v) = lookup("STENCIL_REFERENCE") {
            cfg.include_pyr_up_reference = parse_flag(&v)?;
        }
        if let Some(v) = lookup("STENCIL_ORIGINAL") {
            cfg.include_original = parse_flag(&v)?;
        }
        if let Some(v) = lookup("STENCIL_WORKGROUP") {
            cfg.workgroup = Some(parse_workgroup(&v)?);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scale_factor == 0 {
            return Err(StencilError::InvalidScaleFactor(0));
        }
        if self.display_zoom == 0 {
            return Err(StencilError::Config("display zoom must be at least 1".to_string()));
        }
        if let Some((x, y)) = self.workgroup {
            WorkgroupSize::checked(x, y, self.profile)
                .map_err(|e| StencilError::Config(format!("workgroup {x}x{y}: {e}")))?;
        }
        Ok(())
    }

    pub fn scale(&self) -> Result<ScaleFactor> {
        ScaleFactor::new(self.scale_factor)
    }
}

fn parse_profile(s: &str) -> Result<DeviceProfile> {
    match s.trim().to_ascii_lowercase().as_str() {
        "native" => Ok(DeviceProfile::Native),
        "rpi" | "raspberrypi" | "raspberry-pi" => Ok(DeviceProfile::RaspberryPi),
        other => Err(StencilError::Config(format!("unknown device profile `{other}`"))),
    }
}

fn parse_number<T: FromStr>(key: &str, s: &str) -> Result<T> {
    s.trim()
        .parse()
        .map_err(|_| StencilError::Config(format!("{key}: `{s}` is not a non-negative integer")))
}

fn parse_flag(s: &str) -> Result<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(StencilError::Config(format!("`{other}` is not a boolean"))),
    }
}

fn parse_workgroup(s: &str) -> Result<(u32, u32)> {
    let (x, y) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| StencilError::Config(format!("workgroup `{s}` is not of the form XxY")))?;
    Ok((
        parse_number("STENCIL_WORKGROUP", x)?,
        parse_number("STENCIL_WORKGROUP", y)?,
    ))
}
