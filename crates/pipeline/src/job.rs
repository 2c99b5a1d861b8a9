//! Watershed jobs
//!
//! A job owns the pour point, the DEM box around it and the name its files
//! are stored under. [`WatershedJob::run`] drives acquisition, delineation,
//! the clipping check with its single retry, and export.

use crate::error::{JobError, Result};
use crate::export;
use crate::log::JobLog;
use geo::{Coord, Polygon};
use serde::Serialize;
use sheed_algorithms::hydrology::{Catchment, CatchmentDelineation, CatchmentParams};
use sheed_cloud::{DemCache, DemError, DemRequest, DemSource, DEFAULT_DATASET};
use sheed_core::io::read_geotiff;
use sheed_core::{Algorithm, BoundingBox, Raster};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Half-size in degrees of the DEM box when the caller does not choose one
pub const DEFAULT_EXPAND_FACTOR: f64 = 0.05;

/// A catchment vertex closer than this (in degrees) to an edge of the DEM
/// box means the catchment was cut off by the DEM extent.
pub const CLIP_TOLERANCE: f64 = 0.0002;

/// Expansion factor of the one retry made after clipping
pub const RETRY_EXPAND_FACTOR: f64 = 0.1;

/// What a client asks for
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub lat: f64,
    pub lon: f64,
    /// Display name; empty selects [`default_name`]
    pub name: String,
    pub expand_factor: f64,
    /// WebSocket session the progress lines belong to; may be empty
    pub client_id: String,
    /// Provider dataset, e.g. `USGS10m`
    pub dataset: String,
}

impl JobRequest {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            name: String::new(),
            expand_factor: DEFAULT_EXPAND_FACTOR,
            client_id: String::new(),
            dataset: DEFAULT_DATASET.to_string(),
        }
    }
}

/// Result handed back to the client once the job is done.
///
/// `expand_factor` and `name` are the values in effect after a retry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobOutcome {
    pub clipped: bool,
    pub dem: String,
    pub expand_factor: f64,
    pub geojson: PathBuf,
    pub kml: PathBuf,
    pub lat: f64,
    pub lon: f64,
    pub name: String,
}

/// Format a float the way job names have always been spelled: shortest
/// round-trip digits, with a trailing `.0` on whole numbers.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Name used when the client leaves it blank: `{lat}_{lon}_{expand_factor}`
pub fn default_name(lat: f64, lon: f64, expand_factor: f64) -> String {
    format!(
        "{}_{}_{}",
        format_float(lat),
        format_float(lon),
        format_float(expand_factor)
    )
}

/// First exterior vertex, over all polygons, lying within
/// [`CLIP_TOLERANCE`] of an edge of `bbox`, with its distance to that edge.
pub fn clipping_vertex(polygons: &[Polygon<f64>], bbox: &BoundingBox) -> Option<(Coord<f64>, f64)> {
    polygons
        .iter()
        .flat_map(|polygon| polygon.exterior().coords())
        .find_map(|c| {
            let d = bbox.distance_to_edge(c.x, c.y);
            (d < CLIP_TOLERANCE).then_some((*c, d))
        })
}

/// One watershed computation
#[derive(Debug, Clone)]
pub struct WatershedJob {
    lat: f64,
    lon: f64,
    name: String,
    expand_factor: f64,
    client_id: String,
    dataset: String,
    bbox: BoundingBox,
    params: CatchmentParams,
}

impl WatershedJob {
    pub fn new(request: JobRequest) -> Result<Self> {
        let JobRequest { lat, lon, name, expand_factor, client_id, dataset } = request;

        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(JobError::Invalid(format!("pour point {lat},{lon} is not a valid coordinate")));
        }
        if !expand_factor.is_finite() || expand_factor <= 0.0 {
            return Err(JobError::Invalid(format!(
                "expand factor must be positive, got {expand_factor}"
            )));
        }
        if dataset.trim().is_empty() {
            return Err(JobError::Invalid("DEM dataset is empty".to_string()));
        }

        let name = if name.is_empty() {
            default_name(lat, lon, expand_factor)
        } else {
            name
        };

        Ok(Self {
            lat,
            lon,
            name,
            expand_factor,
            client_id,
            dataset,
            bbox: BoundingBox::around(lon, lat, expand_factor),
            params: CatchmentParams::default(),
        })
    }

    /// Override the delineation parameters (snap threshold, flat epsilon)
    pub fn with_catchment_params(mut self, params: CatchmentParams) -> Self {
        self.params = params;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expand_factor(&self) -> f64 {
        self.expand_factor
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Run the job, writing the DEM and the exports under the cache
    /// directory.
    ///
    /// When the first catchment touches the DEM box, the job switches to
    /// [`RETRY_EXPAND_FACTOR`] and a regenerated default name (so the
    /// larger DEM gets its own cache entry) and tries exactly once more.
    /// The second result is exported whether or not it is still clipped.
    pub async fn run(
        mut self,
        source: &dyn DemSource,
        cache: &DemCache,
        log: &dyn JobLog,
    ) -> Result<JobOutcome> {
        let (mut catchment, mut clipped) = self.attempt(source, cache, log).await?;

        if clipped {
            self.say(
                log,
                &format!(
                    "Clipping detected, retrying with expand_factor={}",
                    format_float(RETRY_EXPAND_FACTOR)
                ),
            );
            self.expand_factor = RETRY_EXPAND_FACTOR;
            self.bbox = BoundingBox::around(self.lon, self.lat, self.expand_factor);
            self.name = default_name(self.lat, self.lon, self.expand_factor);

            (catchment, clipped) = self.attempt(source, cache, log).await?;
            if clipped {
                warn!(name = %self.name, "catchment still clipped after retry");
            }
        }

        let out = cache.dir();
        let geojson = export::geojson_path(out, &self.name);
        export::geojson::write(&geojson, &self.name, &catchment.polygons).await?;
        self.say(log, &format!("GeoJSON generated: \"{}\"", geojson.display()));

        let kml = export::kml_path(out, &self.name);
        export::kml::write(&kml, &self.name, (self.lon, self.lat), &catchment.polygons).await?;
        self.say(log, &format!("KML generated: \"{}\"", kml.display()));

        self.say(log, "Done!");

        Ok(JobOutcome {
            clipped,
            dem: self.dataset,
            expand_factor: self.expand_factor,
            geojson,
            kml,
            lat: self.lat,
            lon: self.lon,
            name: self.name,
        })
    }

    /// Acquire the DEM for the current box, delineate, check clipping.
    async fn attempt(
        &self,
        source: &dyn DemSource,
        cache: &DemCache,
        log: &dyn JobLog,
    ) -> Result<(Catchment, bool)> {
        let dem_path = self.acquire_dem(source, cache, log).await?;
        let catchment = self.delineate(&dem_path, log).await?;
        let clipped = self.check_clipping(&catchment, log);
        Ok((catchment, clipped))
    }

    async fn acquire_dem(
        &self,
        source: &dyn DemSource,
        cache: &DemCache,
        log: &dyn JobLog,
    ) -> Result<PathBuf> {
        if let Some(path) = cache.lookup(&self.dataset, &self.name).await {
            self.say(log, &format!("Using cached DEM {}", path.display()));
            return Ok(path);
        }

        self.say(
            log,
            &format!(
                "Fetching {} DEM centered on {},{} from opentopography.org...",
                self.dataset,
                format_float(self.lat),
                format_float(self.lon)
            ),
        );

        let request = DemRequest::new(self.dataset.clone(), self.bbox);
        let bytes = match source.fetch(&request).await {
            Ok(bytes) => bytes,
            Err(err) => {
                match &err {
                    DemError::Status { status, request, body } => {
                        self.say(log, &format!("Error: {status}. Request was {request}"));
                        self.say(log, body);
                    }
                    other => self.say(log, &format!("Error: {other}")),
                }
                return Err(err.into());
            }
        };

        let path = cache.store(&self.dataset, &self.name, &bytes).await?;
        self.say(log, &format!("{} downloaded successfully.", path.display()));
        Ok(path)
    }

    /// Raster work runs on the blocking pool so the runtime keeps serving
    /// other connections.
    async fn delineate(&self, dem_path: &Path, log: &dyn JobLog) -> Result<Catchment> {
        self.say(log, "Preparing DEM");
        let path = dem_path.to_path_buf();
        let dem: Raster<f64> = tokio::task::spawn_blocking(move || read_geotiff(path)).await??;
        debug!(rows = dem.rows(), cols = dem.cols(), "DEM loaded");

        self.say(log, "Calculating catchment");
        let delineation = CatchmentDelineation { pour_point: (self.lon, self.lat) };
        let params = self.params.clone();
        let catchment =
            tokio::task::spawn_blocking(move || delineation.execute(dem, params)).await??;

        if catchment.polygons.is_empty() {
            return Err(JobError::NoCatchment { lat: self.lat, lon: self.lon });
        }
        Ok(catchment)
    }

    fn check_clipping(&self, catchment: &Catchment, log: &dyn JobLog) -> bool {
        match clipping_vertex(&catchment.polygons, &self.bbox) {
            Some((c, d)) => {
                self.say(
                    log,
                    &format!("Clipping detected: {},{} {}", format_float(c.y), format_float(c.x), format_float(d)),
                );
                true
            }
            None => false,
        }
    }

    fn say(&self, log: &dyn JobLog, msg: &str) {
        let line = format!("[{}] {msg}", self.client_id);
        info!("{line}");
        log.log(&line);
    }
}
