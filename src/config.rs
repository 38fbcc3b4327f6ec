use json::JsonValue;

use crate::{
    datatypes::Edge,
    error::{FeaError, Result},
};

/// Material and section constants shared by every solid element
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub youngs_modulus: f64,
    pub poisson_ratio: f64,
    pub part_thickness: f64,
    /// Total domain area in design units; divided evenly across the grid
    pub domain_area: f64,
}

impl Default for Material {
    fn default() -> Self {
        Material {
            youngs_modulus: 2e6,
            poisson_ratio: 0.3,
            part_thickness: 50.0,
            domain_area: 4000.0,
        }
    }
}

impl Material {
    pub fn validate(&self) -> Result<()> {
        if !(self.youngs_modulus > 0.0) {
            return Err(FeaError::InvalidMaterial(format!(
                "youngs modulus must be positive, got {}",
                self.youngs_modulus
            )));
        }
        if !(0.0..0.5).contains(&self.poisson_ratio) {
            return Err(FeaError::InvalidMaterial(format!(
                "poisson ratio must lie in [0, 0.5), got {}",
                self.poisson_ratio
            )));
        }
        if !(self.part_thickness > 0.0) {
            return Err(FeaError::InvalidMaterial(format!(
                "part thickness must be positive, got {}",
                self.part_thickness
            )));
        }
        if !(self.domain_area > 0.0) {
            return Err(FeaError::InvalidMaterial(format!(
                "domain area must be positive, got {}",
                self.domain_area
            )));
        }
        Ok(())
    }
}

/// Deck load, split into equal point loads on the top node of each column
#[derive(Debug, Clone, PartialEq)]
pub struct LoadCase {
    pub total_load: f64,
}

impl Default for LoadCase {
    fn default() -> Self {
        LoadCase { total_load: 10000.0 }
    }
}

/// Maps design-space edges onto grid-index coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryScaling {
    /// Multiplied by `nelx` to scale edge x coordinates
    pub x_scale: f64,
    /// Multiplied by `nely` to scale edge y coordinates
    pub y_scale: f64,
    /// Far end of every membership ray
    pub ray_origin: (f64, f64),
}

impl Default for GeometryScaling {
    fn default() -> Self {
        GeometryScaling {
            x_scale: 0.05,
            y_scale: 0.1,
            ray_origin: (1.0, 30.0),
        }
    }
}

/// How fixed DOFs are chosen
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SupportPolicy {
    /// Clamp the bottom-left and bottom-right nodes of the domain
    #[default]
    BottomCorners,
    /// Legacy placement derived from the min/max void element index
    VoidExtent,
    /// Explicit 0-based DOF indices
    Dofs(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolverKind {
    /// Dense Cholesky factorization of the free-DOF system
    Direct,
    /// Conjugate gradient over the sparse free-DOF system
    ConjugateGradient {
        max_iters: u64,
        /// Relative residual accepted as converged
        tolerance: f64,
        progress: bool,
    },
}

impl Default for SolverKind {
    fn default() -> Self {
        SolverKind::Direct
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    pub kind: SolverKind,
    /// Smallest accepted ratio between the smallest and largest pivot
    pub singular_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            kind: SolverKind::default(),
            singular_tolerance: 1e-12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalysisConfig {
    pub material: Material,
    pub load: LoadCase,
    pub geometry: GeometryScaling,
    pub supports: SupportPolicy,
    pub solver: SolverConfig,
}

/// Reads and parses a JSON file
///
/// # Arguments
/// * `path` - The path to the input file
///
/// # Returns
/// A JsonValue object
fn load_json_file(path: &str) -> Result<JsonValue> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(err) => {
            return Err(FeaError::Input(format!(
                "Unable to open input file {path}: {err}"
            )))
        }
    };

    match json::parse(&contents) {
        Ok(v) => Ok(v),
        Err(err) => Err(FeaError::Input(format!("Error in json file {path}: {err}"))),
    }
}

/// Reads an optional float field, keeping `current` when the key is absent
fn read_f64(section: &JsonValue, section_name: &str, key: &str, current: f64) -> Result<f64> {
    if !section.has_key(key) {
        return Ok(current);
    }
    match section[key].as_f64() {
        Some(v) => Ok(v),
        None => Err(FeaError::Input(format!(
            "Bad value for {key} in {section_name} section"
        ))),
    }
}

fn parse_supports(value: &JsonValue) -> Result<SupportPolicy> {
    if let Some(name) = value.as_str() {
        return match name {
            "bottom_corners" => Ok(SupportPolicy::BottomCorners),
            "void_extent" => Ok(SupportPolicy::VoidExtent),
            other => Err(FeaError::Input(format!("Unknown support policy {other}"))),
        };
    }

    if value.has_key("dofs") && value["dofs"].is_array() {
        let mut dofs: Vec<usize> = Vec::new();
        for dof in value["dofs"].members() {
            match dof.as_usize() {
                Some(d) => dofs.push(d),
                None => {
                    return Err(FeaError::Input(
                        "Support dofs must be non-negative integers".to_owned(),
                    ))
                }
            }
        }
        return Ok(SupportPolicy::Dofs(dofs));
    }

    Err(FeaError::Input(
        "supports must be \"bottom_corners\", \"void_extent\" or {\"dofs\": [...]}".to_owned(),
    ))
}

fn parse_solver(value: &JsonValue, current: SolverConfig) -> Result<SolverConfig> {
    let singular_tolerance = read_f64(
        value,
        "solver",
        "singular_tolerance",
        current.singular_tolerance,
    )?;

    let kind = match value["kind"].as_str() {
        None if !value.has_key("kind") => current.kind,
        Some("direct") => SolverKind::Direct,
        Some("conjugate_gradient") => SolverKind::ConjugateGradient {
            max_iters: value["max_iters"].as_u64().unwrap_or(100_000),
            tolerance: read_f64(value, "solver", "tolerance", 1e-10)?,
            progress: value["progress"].as_bool().unwrap_or(false),
        },
        _ => {
            return Err(FeaError::Input(
                "solver kind must be \"direct\" or \"conjugate_gradient\"".to_owned(),
            ))
        }
    };

    Ok(SolverConfig {
        kind,
        singular_tolerance,
    })
}

/// Parses an AnalysisConfig from a JsonValue. Absent sections and keys keep
/// their defaults.
pub fn parse_config(input_json: &JsonValue) -> Result<AnalysisConfig> {
    let mut config = AnalysisConfig::default();

    let material = &input_json["material"];
    config.material = Material {
        youngs_modulus: read_f64(
            material,
            "material",
            "youngs_modulus",
            config.material.youngs_modulus,
        )?,
        poisson_ratio: read_f64(
            material,
            "material",
            "poisson_ratio",
            config.material.poisson_ratio,
        )?,
        part_thickness: read_f64(
            material,
            "material",
            "part_thickness",
            config.material.part_thickness,
        )?,
        domain_area: read_f64(
            material,
            "material",
            "domain_area",
            config.material.domain_area,
        )?,
    };
    config.material.validate()?;

    config.load.total_load = read_f64(
        &input_json["load"],
        "load",
        "total_load",
        config.load.total_load,
    )?;

    let geometry = &input_json["geometry"];
    config.geometry.x_scale = read_f64(geometry, "geometry", "x_scale", config.geometry.x_scale)?;
    config.geometry.y_scale = read_f64(geometry, "geometry", "y_scale", config.geometry.y_scale)?;
    if geometry.has_key("ray_origin") {
        let origin = &geometry["ray_origin"];
        match (origin[0].as_f64(), origin[1].as_f64()) {
            (Some(x), Some(y)) => config.geometry.ray_origin = (x, y),
            _ => {
                return Err(FeaError::Input(
                    "ray_origin must be a [x, y] pair".to_owned(),
                ))
            }
        }
    }

    if input_json.has_key("supports") {
        config.supports = parse_supports(&input_json["supports"])?;
    }

    if input_json.has_key("solver") {
        config.solver = parse_solver(&input_json["solver"], config.solver)?;
    }

    Ok(config)
}

/// Loads an AnalysisConfig from a json file
pub fn load_config(path: &str) -> Result<AnalysisConfig> {
    parse_config(&load_json_file(path)?)
}

/// Parses edges from a json array of `[active, x1, y1, x2, y2]` rows
pub fn parse_edges(input_json: &JsonValue) -> Result<Vec<Edge>> {
    if !input_json.is_array() {
        return Err(FeaError::Input(
            "Edge list must be a json array".to_owned(),
        ));
    }

    let mut edges: Vec<Edge> = Vec::with_capacity(input_json.len());
    for (i, row) in input_json.members().enumerate() {
        if !row.is_array() || row.len() < 5 {
            return Err(FeaError::Input(format!(
                "Edge {i} must be an array of [active, x1, y1, x2, y2]"
            )));
        }

        let active = match (row[0].as_bool(), row[0].as_f64()) {
            (Some(b), _) => b,
            (None, Some(n)) => n == 1.0,
            _ => {
                return Err(FeaError::Input(format!(
                    "Edge {i} has a non-boolean active flag"
                )))
            }
        };

        let mut coords = [0.0; 4];
        for (k, coord) in coords.iter_mut().enumerate() {
            *coord = match row[k + 1].as_f64() {
                Some(v) => v,
                None => {
                    return Err(FeaError::Input(format!(
                        "Edge {i} has a non-float coordinate"
                    )))
                }
            };
        }

        edges.push(Edge {
            active,
            x1: coords[0],
            y1: coords[1],
            x2: coords[2],
            y2: coords[3],
        });
    }

    Ok(edges)
}

/// Loads edges from a json file
pub fn load_edges(path: &str) -> Result<Vec<Edge>> {
    parse_edges(&load_json_file(path)?)
}
