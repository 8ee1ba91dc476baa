//! Simulation configuration.

/// Tunable parameters for a full simulation run.
#[derive(Debug, Clone)]
pub struct SimParams {
    /// Grid width in cells (x axis, wrapped).
    pub width: u32,
    /// Grid height in cells (z axis, wrapped).
    pub height: u32,
    /// Edge length of one cell in world units.
    pub cell_size: f32,
    /// Baseline crust height before fractal perturbation.
    pub base_height: f32,
    /// Overall vertical scale; several process constants derive from it.
    pub max_height: f32,
    /// Sea level as a fraction of `max_height` added to `base_height`.
    pub sea_level: f32,
    /// Number of plates carved by the initial partition.
    pub plate_count: u32,
    /// Lloyd relaxation rounds applied to plate seed sites.
    pub voronoi_relaxation_steps: u32,
    /// Rate multiplier for spontaneous volcano spawning.
    pub volcano_frequency: f32,
    /// RNG seed; identical params and seed reproduce the run exactly.
    pub seed: u64,
    /// Emit `[stage]` progress lines during stepping.
    pub log_stages: bool,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            width: 128,
            height: 128,
            cell_size: 1.0,
            base_height: 2.0,
            max_height: 10.0,
            sea_level: 0.12,
            plate_count: 8,
            voronoi_relaxation_steps: 2,
            volcano_frequency: 1.0,
            seed: 0,
            log_stages: false,
        }
    }
}

impl SimParams {
    /// Absolute world-space sea height.
    #[inline]
    pub fn sea_height(&self) -> f32 {
        self.base_height + self.sea_level * self.max_height
    }

    /// Particle size used by volcanic deposition.
    #[inline]
    pub fn rock_size(&self) -> f32 {
        self.max_height / 10.0
    }
}
