//! # Pseudo-axis engine framework
//!
//! An [`Engine`] maps axis positions to derived observables (pseudo-axes)
//! and back. Each engine owns a family of [`Mode`]s; a mode names the
//! axes the solver reads, the axes it is free to vary, the residual
//! functions closing the system, and the mode-local parameters (surface
//! normals, reference reflections, fixed angles...).
//!
//! Engines and modes vary only through their operations records: a mode is
//! data plus three function slots (init / get / set), never a trait
//! hierarchy. Auto modes hand their residuals to the
//! [`solver`](crate::engine::solver); analytic modes (eulerians) install a
//! closed-form set function instead.
//!
//! The inverse entry point never mutates the input geometry: the solver
//! works on a deep copy and returns new deep copies inside a
//! [`GeometryList`].
//!
//! ## See also
//! * [`crate::engine::solver`] – the multi-root core.
//! * [`crate::factory`] – per-diffractometer engine catalogs.

pub mod eulerians;
pub mod hkl;
pub mod psi;
pub mod q;
pub mod readonly;
pub mod solver;
pub mod tth;

use nalgebra::{DVector, Vector3};
use tracing::debug;

use crate::detector::Detector;
use crate::geometry::list::{GeometryList, MultiplyFn};
use crate::geometry::Geometry;
use crate::gonio_errors::GonioError;
use crate::parameter::Parameter;
use crate::sample::Sample;
use crate::unit::UnitKind;

pub use solver::SolveParams;

/// What an engine consumes beyond its write axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependencies {
    pub axes: bool,
    pub energy: bool,
    pub sample: bool,
}

impl Dependencies {
    pub const AXES_ENERGY: Dependencies = Dependencies {
        axes: true,
        energy: true,
        sample: false,
    };
    pub const ALL: Dependencies = Dependencies {
        axes: true,
        energy: true,
        sample: true,
    };
}

/// What the current mode supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub readable: bool,
    pub writable: bool,
    pub initializable: bool,
}

/// Mode-specific state captured at initialization time.
#[derive(Debug, Clone, PartialEq)]
pub enum ModeData {
    None,
    /// Reference reflection captured by the psi engine.
    Psi { hkl0: Vector3<f64> },
}

/// Evaluation context handed to the residual functions: the working
/// geometry (a deep copy of the caller's), the bound detector and sample,
/// the pseudo-axis targets and the mode-local parameters.
pub struct Workspace<'a> {
    pub geometry: &'a mut Geometry,
    pub detector: &'a Detector,
    pub sample: &'a Sample,
    /// Pseudo-axis target values, default unit, engine order.
    pub targets: &'a [f64],
    /// Mode-local parameters, mode order.
    pub parameters: &'a [Parameter],
    /// Write-axis indices into the working geometry.
    pub axes_w: &'a [usize],
    pub data: &'a ModeData,
}

impl Workspace<'_> {
    /// Install the solver vector into the write axes and refresh the
    /// holder caches.
    pub fn set_axes(&mut self, x: &[f64]) {
        for (&idx, &value) in self.axes_w.iter().zip(x) {
            self.geometry.axis_value_set_raw(idx, value);
        }
        self.geometry.update();
    }

    /// Mode-local parameter value by index, default unit.
    pub fn parameter(&self, idx: usize) -> f64 {
        self.parameters[idx].value(UnitKind::Default)
    }
}

/// A residual function: (x, context) → residual vector.
///
/// Every function is a complete square system (`size` rows for `size`
/// write axes); a mode carrying several functions describes alternative
/// branches whose solutions are merged.
pub type ResidualFn = fn(&[f64], &mut Workspace) -> Result<DVector<f64>, GonioError>;

pub struct ResidualFunction {
    pub f: ResidualFn,
    pub size: usize,
}

/// Forward computation of the pseudo-axis values for the current state.
pub type GetFn = fn(&Mode, &Geometry, &Detector, &Sample) -> Result<Vec<f64>, GonioError>;

/// Capture of the reference state needed by a stateful mode.
pub type InitFn = fn(&mut Mode, &Geometry, &Detector, &Sample) -> Result<(), GonioError>;

/// Closed-form inverse: push candidate geometries into the list.
pub type ClosedSetFn = fn(
    &Mode,
    &[f64],
    &Geometry,
    &Detector,
    &Sample,
    &mut GeometryList,
) -> Result<(), GonioError>;

pub enum SetOp {
    /// Solve the residual functions numerically.
    Auto,
    /// Analytic inverse.
    Closed(ClosedSetFn),
}

/// One way of closing the inverse problem: write axes + residuals +
/// mode-local parameters.
pub struct Mode {
    name: &'static str,
    axes_r: &'static [&'static str],
    axes_w: &'static [&'static str],
    functions: &'static [ResidualFunction],
    parameters: Vec<Parameter>,
    parameter_defaults: Vec<f64>,
    capabilities: Capabilities,
    get: GetFn,
    set: SetOp,
    init: Option<InitFn>,
    pub(crate) data: ModeData,
}

impl Mode {
    /// Read/write mode whose inverse goes through the solver.
    pub fn auto(
        name: &'static str,
        axes_r: &'static [&'static str],
        axes_w: &'static [&'static str],
        functions: &'static [ResidualFunction],
        parameters: Vec<Parameter>,
        get: GetFn,
    ) -> Mode {
        let parameter_defaults = parameters
            .iter()
            .map(|p| p.value(UnitKind::Default))
            .collect();
        Mode {
            name,
            axes_r,
            axes_w,
            functions,
            parameters,
            parameter_defaults,
            capabilities: Capabilities {
                readable: true,
                writable: true,
                initializable: false,
            },
            get,
            set: SetOp::Auto,
            init: None,
            data: ModeData::None,
        }
    }

    /// Forward-only mode.
    pub fn readonly(
        name: &'static str,
        axes_r: &'static [&'static str],
        parameters: Vec<Parameter>,
        get: GetFn,
    ) -> Mode {
        let parameter_defaults = parameters
            .iter()
            .map(|p| p.value(UnitKind::Default))
            .collect();
        Mode {
            name,
            axes_r,
            axes_w: &[],
            functions: &[],
            parameters,
            parameter_defaults,
            capabilities: Capabilities {
                readable: true,
                writable: false,
                initializable: false,
            },
            get,
            set: SetOp::Auto,
            init: None,
            data: ModeData::None,
        }
    }

    /// Replace the numerical inverse by a closed form.
    pub fn with_closed_set(mut self, set: ClosedSetFn) -> Mode {
        self.set = SetOp::Closed(set);
        self
    }

    /// Require an initialization capture before get/set.
    pub fn with_init(mut self, init: InitFn) -> Mode {
        self.init = Some(init);
        self.capabilities.initializable = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn axes_read(&self) -> &'static [&'static str] {
        self.axes_r
    }

    pub fn axes_write(&self) -> &'static [&'static str] {
        self.axes_w
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn reset_parameters(&mut self) {
        let defaults = self.parameter_defaults.clone();
        for (parameter, default) in self.parameters.iter_mut().zip(defaults) {
            // defaults were captured from the parameters, never NaN
            let _ = parameter.set_value(default, UnitKind::Default);
        }
    }
}

/// A family of pseudo-axes sharing modes.
pub struct Engine {
    name: &'static str,
    pseudo_axes: Vec<Parameter>,
    dependencies: Dependencies,
    modes: Vec<Mode>,
    current: usize,
    initialized: bool,
}

impl Engine {
    pub(crate) fn new(
        name: &'static str,
        pseudo_axes: Vec<Parameter>,
        dependencies: Dependencies,
        modes: Vec<Mode>,
    ) -> Engine {
        assert!(!modes.is_empty(), "an engine needs at least one mode");
        Engine {
            name,
            pseudo_axes,
            dependencies,
            modes,
            current: 0,
            initialized: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn dependencies(&self) -> Dependencies {
        self.dependencies
    }

    pub fn pseudo_axes(&self) -> &[Parameter] {
        &self.pseudo_axes
    }

    pub fn pseudo_axis_names(&self) -> Vec<&'static str> {
        self.pseudo_axes.iter().map(|p| p.name()).collect()
    }

    pub fn modes_names_get(&self) -> Vec<&'static str> {
        self.modes.iter().map(|m| m.name()).collect()
    }

    pub fn current_mode(&self) -> &Mode {
        &self.modes[self.current]
    }

    pub fn current_mode_name(&self) -> &'static str {
        self.modes[self.current].name()
    }

    /// Switch mode by name; mode-local parameters are reset to their
    /// defaults.
    pub fn current_mode_set(&mut self, name: &str) -> Result<(), GonioError> {
        let idx = self
            .modes
            .iter()
            .position(|m| m.name() == name)
            .ok_or_else(|| {
                GonioError::bad_input(name, "this engine does not provide this mode")
            })?;
        self.current = idx;
        self.modes[idx].reset_parameters();
        Ok(())
    }

    /// Capabilities of the current mode.
    pub fn capabilities(&self) -> Capabilities {
        self.modes[self.current].capabilities()
    }

    pub fn parameters_names_get(&self) -> Vec<&'static str> {
        self.modes[self.current]
            .parameters()
            .iter()
            .map(|p| p.name())
            .collect()
    }

    pub fn parameters_values_get(&self, unit_kind: UnitKind) -> Vec<f64> {
        self.modes[self.current]
            .parameters()
            .iter()
            .map(|p| p.value(unit_kind))
            .collect()
    }

    pub fn parameters_values_set(
        &mut self,
        values: &[f64],
        unit_kind: UnitKind,
    ) -> Result<(), GonioError> {
        let mode = &mut self.modes[self.current];
        if values.len() != mode.parameters.len() {
            return Err(GonioError::bad_input(
                mode.name,
                format!(
                    "expected {} parameter values, got {}",
                    mode.parameters.len(),
                    values.len()
                ),
            ));
        }
        for (parameter, &value) in mode.parameters.iter_mut().zip(values) {
            parameter.set_value(value, unit_kind)?;
        }
        Ok(())
    }

    pub fn initialized_get(&self) -> bool {
        self.initialized
    }

    /// Capture the current (geometry, detector, sample) snapshot as the
    /// reference of the current mode.
    ///
    /// On failure the previous initialization state is preserved.
    pub fn initialized_set(
        &mut self,
        initialized: bool,
        geometry: &Geometry,
        detector: &Detector,
        sample: &Sample,
    ) -> Result<(), GonioError> {
        if !initialized {
            self.initialized = false;
            return Ok(());
        }
        let mode = &mut self.modes[self.current];
        if let Some(init) = mode.init {
            init(mode, geometry, detector, sample)?;
        }
        self.initialized = true;
        Ok(())
    }

    fn check_initialized(&self) -> Result<(), GonioError> {
        if self.modes[self.current].init.is_some() && !self.initialized {
            return Err(GonioError::NotInitialized(self.name.to_string()));
        }
        Ok(())
    }

    /// Forward computation: refresh the pseudo-axis values from the
    /// current axis positions.
    pub fn pseudo_axis_values_get(
        &mut self,
        geometry: &Geometry,
        detector: &Detector,
        sample: &Sample,
        unit_kind: UnitKind,
    ) -> Result<Vec<f64>, GonioError> {
        self.check_initialized()?;
        let mode = &self.modes[self.current];
        if !mode.capabilities.readable {
            return Err(GonioError::bad_input(mode.name, "this mode is not readable"));
        }
        let values = (mode.get)(mode, geometry, detector, sample)?;
        for (pseudo, &value) in self.pseudo_axes.iter_mut().zip(values.iter()) {
            pseudo.set_value(value, UnitKind::Default)?;
        }
        Ok(self
            .pseudo_axes
            .iter()
            .map(|p| p.value(unit_kind))
            .collect())
    }

    /// Inverse computation: find the axis configurations realizing the
    /// requested pseudo-axis values under the current mode.
    ///
    /// The input geometry is left untouched; the returned list holds deep
    /// copies, already expanded (multiply hook + 2π multiplicity) and
    /// cleaned of out-of-range items. An empty list is a normal outcome.
    pub fn pseudo_axis_values_set(
        &mut self,
        values: &[f64],
        unit_kind: UnitKind,
        geometry: &Geometry,
        detector: &Detector,
        sample: &Sample,
        params: &SolveParams,
        multiply: Option<MultiplyFn>,
    ) -> Result<GeometryList, GonioError> {
        self.check_initialized()?;
        let mode = &self.modes[self.current];
        if !mode.capabilities.writable {
            return Err(GonioError::bad_input(mode.name, "this mode is not writable"));
        }
        if values.len() != self.pseudo_axes.len() {
            return Err(GonioError::bad_input(
                self.name,
                format!(
                    "expected {} pseudo-axis values, got {}",
                    self.pseudo_axes.len(),
                    values.len()
                ),
            ));
        }
        for (pseudo, &value) in self.pseudo_axes.iter_mut().zip(values) {
            pseudo.set_value(value, unit_kind)?;
        }
        let targets: Vec<f64> = self
            .pseudo_axes
            .iter()
            .map(|p| p.value(UnitKind::Default))
            .collect();

        let mode = &self.modes[self.current];
        let mut list = GeometryList::with_multiply(multiply);
        match mode.set {
            SetOp::Auto => {
                let mut breakdown = false;
                for function in mode.functions {
                    let outcome = solver::solve_function(
                        function, mode, &targets, geometry, detector, sample, params, &mut list,
                    )?;
                    breakdown |= outcome.breakdown;
                }
                if list.is_empty() && breakdown {
                    return Err(GonioError::SolveFailed {
                        name: self.name.to_string(),
                        reason: "the residuals broke down on every attempt".to_string(),
                    });
                }
            }
            SetOp::Closed(set) => {
                set(mode, &targets, geometry, detector, sample, &mut list)?
            }
        }

        debug!(
            engine = self.name,
            mode = mode.name,
            solutions = list.len(),
            "inverse solve finished"
        );

        list.multiply_from_range();
        list.multiply();
        list.remove_invalid();
        Ok(list)
    }
}

/// Hook run by the engine list after a successful set; may re-expand the
/// solution list using the engine-list global parameters.
pub type PostEngineSetFn = fn(&[Parameter], &mut GeometryList);

struct Context {
    geometry: Geometry,
    detector: Detector,
    sample: Sample,
}

/// Ordered engine container bound to one (geometry, detector, sample).
pub struct EngineList {
    engines: Vec<Engine>,
    parameters: Vec<Parameter>,
    post_engine_set: Option<PostEngineSetFn>,
    multiply: Option<MultiplyFn>,
    geometries: GeometryList,
    context: Option<Context>,
    solve_params: SolveParams,
}

impl EngineList {
    pub(crate) fn new() -> EngineList {
        EngineList {
            engines: Vec::new(),
            parameters: Vec::new(),
            post_engine_set: None,
            multiply: None,
            geometries: GeometryList::new(),
            context: None,
            solve_params: SolveParams::default(),
        }
    }

    pub(crate) fn add_engine(&mut self, engine: Engine) {
        self.engines.push(engine);
    }

    pub(crate) fn set_parameters(&mut self, parameters: Vec<Parameter>) {
        self.parameters = parameters;
    }

    pub(crate) fn set_post_engine_set(&mut self, hook: PostEngineSetFn) {
        self.post_engine_set = Some(hook);
    }

    pub(crate) fn set_multiply(&mut self, multiply: MultiplyFn) {
        self.multiply = Some(multiply);
    }

    /// Bind the working (geometry, detector, sample) context.
    ///
    /// The engine list keeps its own copies; callers mutate the bound
    /// geometry through [`EngineList::geometry_mut`].
    pub fn init(&mut self, geometry: &Geometry, detector: &Detector, sample: &Sample) {
        self.context = Some(Context {
            geometry: geometry.clone(),
            detector: detector.clone(),
            sample: sample.clone(),
        });
    }

    pub fn engines_names_get(&self) -> Vec<&'static str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    fn engine_index(&self, name: &str) -> Result<usize, GonioError> {
        self.engines
            .iter()
            .position(|e| e.name() == name)
            .ok_or_else(|| {
                GonioError::bad_input(name, "this engine list does not contain this engine")
            })
    }

    pub fn engine_get(&self, name: &str) -> Result<&Engine, GonioError> {
        Ok(&self.engines[self.engine_index(name)?])
    }

    pub fn engine_get_mut(&mut self, name: &str) -> Result<&mut Engine, GonioError> {
        let idx = self.engine_index(name)?;
        Ok(&mut self.engines[idx])
    }

    /// Engine-list global parameters (e.g. the MED 2+3 v2
    /// `eta_a_rotation` switch).
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut [Parameter] {
        &mut self.parameters
    }

    pub fn solve_params(&self) -> &SolveParams {
        &self.solve_params
    }

    pub fn solve_params_set(&mut self, params: SolveParams) {
        self.solve_params = params;
    }

    fn context(&self) -> Result<&Context, GonioError> {
        self.context.as_ref().ok_or_else(|| {
            GonioError::NotInitialized("engine list".to_string())
        })
    }

    /// The bound working geometry.
    pub fn geometry(&self) -> Result<&Geometry, GonioError> {
        Ok(&self.context()?.geometry)
    }

    pub fn geometry_mut(&mut self) -> Result<&mut Geometry, GonioError> {
        Ok(&mut self
            .context
            .as_mut()
            .ok_or_else(|| GonioError::NotInitialized("engine list".to_string()))?
            .geometry)
    }

    pub fn sample(&self) -> Result<&Sample, GonioError> {
        Ok(&self.context()?.sample)
    }

    pub fn sample_mut(&mut self) -> Result<&mut Sample, GonioError> {
        Ok(&mut self
            .context
            .as_mut()
            .ok_or_else(|| GonioError::NotInitialized("engine list".to_string()))?
            .sample)
    }

    pub fn detector(&self) -> Result<&Detector, GonioError> {
        Ok(&self.context()?.detector)
    }

    /// Solutions of the last inverse solve.
    pub fn geometries(&self) -> &GeometryList {
        &self.geometries
    }

    /// Adopt one solution into the bound geometry.
    pub fn select_solution(
        &mut self,
        item: &crate::geometry::list::GeometryListItem,
    ) -> Result<(), GonioError> {
        let context = self
            .context
            .as_mut()
            .ok_or_else(|| GonioError::NotInitialized("engine list".to_string()))?;
        context.geometry.init_from(item.geometry())
    }

    /// Forward-compute the pseudo-axes of `engine_name` from the bound
    /// geometry.
    pub fn pseudo_axis_values_get(
        &mut self,
        engine_name: &str,
        unit_kind: UnitKind,
    ) -> Result<Vec<f64>, GonioError> {
        let idx = self.engine_index(engine_name)?;
        let context = self
            .context
            .as_ref()
            .ok_or_else(|| GonioError::NotInitialized("engine list".to_string()))?;
        self.engines[idx].pseudo_axis_values_get(
            &context.geometry,
            &context.detector,
            &context.sample,
            unit_kind,
        )
    }

    /// Inverse-solve the pseudo-axes of `engine_name`, run the post-set
    /// hook, keep the solutions, and return them.
    pub fn pseudo_axis_values_set(
        &mut self,
        engine_name: &str,
        values: &[f64],
        unit_kind: UnitKind,
    ) -> Result<GeometryList, GonioError> {
        let idx = self.engine_index(engine_name)?;
        let context = self
            .context
            .as_ref()
            .ok_or_else(|| GonioError::NotInitialized("engine list".to_string()))?;
        let mut list = self.engines[idx].pseudo_axis_values_set(
            values,
            unit_kind,
            &context.geometry,
            &context.detector,
            &context.sample,
            &self.solve_params,
            self.multiply,
        )?;
        if let Some(hook) = self.post_engine_set {
            hook(&self.parameters, &mut list);
        }
        self.geometries = list.clone();
        Ok(list)
    }

    /// Initialize (or reset) the reference snapshot of an engine from the
    /// bound context.
    pub fn initialized_set(
        &mut self,
        engine_name: &str,
        initialized: bool,
    ) -> Result<(), GonioError> {
        let idx = self.engine_index(engine_name)?;
        let context = self
            .context
            .as_ref()
            .ok_or_else(|| GonioError::NotInitialized("engine list".to_string()))?;
        self.engines[idx].initialized_set(
            initialized,
            &context.geometry,
            &context.detector,
            &context.sample,
        )
    }
}
