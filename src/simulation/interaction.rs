use crate::config::{
    DEFAULT_PAINT_COLOR, DEFAULT_PAINT_RADIUS, DEFAULT_PAINT_STRENGTH, DEFAULT_PRECISION,
    DEFAULT_TIME_SCALE, OFF_GRID_POINTER, PAINT_RADIUS_RANGE, PAINT_STRENGTH_RANGE,
    PRECISION_RANGE, TIME_SCALE_RANGE,
};

/// What the pointer paints into
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PaintMode {
    #[default]
    Density,
    Velocity,
    Color,
}

impl PaintMode {
    /// Kernel slot value: 0 = density, 1 = velocity, 2 = color
    pub fn slot_value(self) -> i32 {
        match self {
            PaintMode::Density => 0,
            PaintMode::Velocity => 1,
            PaintMode::Color => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PaintMode::Density => "Density",
            PaintMode::Velocity => "Velocity",
            PaintMode::Color => "Color",
        }
    }
}

/// Raw pointer state for one frame
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerState {
    /// Screen-space position, None while the cursor is outside the window
    pub position: Option<[f32; 2]>,
    pub left: bool,
    pub right: bool,
}

/// Everything the injector reads from the outside world each frame
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    pub pointer: PointerState,
    /// Wall-clock seconds since the previous frame
    pub frame_time: f32,
}

/// User-adjustable parameters. Every setter clamps, so the core only ever
/// sees values inside the control ranges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PaintControls {
    mode: PaintMode,
    radius: i32,
    strength: f32,
    color: [f32; 3],
    time_scale: f32,
    precision: i32,
}

impl Default for PaintControls {
    fn default() -> Self {
        Self {
            mode: PaintMode::default(),
            radius: DEFAULT_PAINT_RADIUS,
            strength: DEFAULT_PAINT_STRENGTH,
            color: DEFAULT_PAINT_COLOR,
            time_scale: DEFAULT_TIME_SCALE,
            precision: DEFAULT_PRECISION,
        }
    }
}

impl PaintControls {
    pub fn mode(&self) -> PaintMode {
        self.mode
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    pub fn color(&self) -> [f32; 3] {
        self.color
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn precision(&self) -> i32 {
        self.precision
    }

    pub fn set_mode(&mut self, mode: PaintMode) {
        self.mode = mode;
    }

    pub fn set_radius(&mut self, radius: i32) {
        self.radius = radius.clamp(PAINT_RADIUS_RANGE.0, PAINT_RADIUS_RANGE.1);
    }

    pub fn set_strength(&mut self, strength: f32) {
        self.strength = clamp_f32(strength, PAINT_STRENGTH_RANGE);
    }

    pub fn set_color(&mut self, color: [f32; 3]) {
        self.color = color.map(|c| clamp_f32(c, (0.0, 1.0)));
    }

    pub fn set_time_scale(&mut self, time_scale: f32) {
        self.time_scale = clamp_f32(time_scale, TIME_SCALE_RANGE);
    }

    pub fn set_precision(&mut self, precision: i32) {
        self.precision = precision.clamp(PRECISION_RANGE.0, PRECISION_RANGE.1);
    }
}

/// NaN collapses to the lower bound so it never reaches the kernel
fn clamp_f32(value: f32, (lo, hi): (f32, f32)) -> f32 {
    if value.is_nan() {
        lo
    } else {
        value.clamp(lo, hi)
    }
}

/// One step's kernel parameters, one field per slot
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamRecord {
    pub paint_color: [f32; 3],
    /// Zero unless a button is held
    pub paint_strength: f32,
    pub paint_radius: i32,
    pub paint_mode: PaintMode,
    pub right_button: bool,
    pub pointer: [f32; 2],
    /// Present only on forwarding steps
    pub secondary_pointer: Option<[f32; 2]>,
    /// frame_time * time_scale
    pub delta_time: f32,
    pub precision: i32,
}

/// Turns pointer and control state into the kernel's parameter record.
///
/// The secondary pointer is forwarded on every other step, starting with the
/// second. That cadence matches the read/write swap but is tracked by its own
/// flag rather than by the scheduler state.
// NOTE: the every-other-step cadence is kept for compatibility with existing
// input behaviour. Nothing in the kernel requires it to alternate.
#[derive(Debug, Default)]
pub struct InteractionInjector {
    forward_secondary: bool,
}

impl InteractionInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build this step's record and flip the forwarding flag
    pub fn gather(&mut self, controls: &PaintControls, input: &FrameInput) -> ParamRecord {
        let pointer = input.pointer.position.unwrap_or(OFF_GRID_POINTER);
        let painting = input.pointer.left || input.pointer.right;

        let record = ParamRecord {
            paint_color: controls.color(),
            paint_strength: if painting { controls.strength() } else { 0.0 },
            paint_radius: controls.radius(),
            paint_mode: controls.mode(),
            right_button: input.pointer.right,
            pointer,
            secondary_pointer: self.forward_secondary.then_some(pointer),
            delta_time: input.frame_time * controls.time_scale(),
            precision: controls.precision(),
        };

        self.forward_secondary = !self.forward_secondary;
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input_at(x: f32, y: f32, left: bool, right: bool) -> FrameInput {
        FrameInput {
            pointer: PointerState {
                position: Some([x, y]),
                left,
                right,
            },
            frame_time: 0.016,
        }
    }

    #[test]
    fn test_controls_clamp() {
        let mut controls = PaintControls::default();
        controls.set_radius(500);
        assert_eq!(controls.radius(), 100);
        controls.set_radius(-3);
        assert_eq!(controls.radius(), 1);
        controls.set_strength(4.0);
        assert_eq!(controls.strength(), 1.0);
        controls.set_strength(f32::NAN);
        assert_eq!(controls.strength(), -1.0);
        controls.set_precision(0);
        assert_eq!(controls.precision(), 1);
        controls.set_time_scale(-50.0);
        assert_eq!(controls.time_scale(), -10.0);
        controls.set_color([2.0, -1.0, 0.5]);
        assert_eq!(controls.color(), [1.0, 0.0, 0.5]);
    }

    #[test]
    fn test_secondary_pointer_alternates() {
        let mut injector = InteractionInjector::new();
        let controls = PaintControls::default();
        let input = input_at(10.0, 20.0, true, false);

        let first = injector.gather(&controls, &input);
        let second = injector.gather(&controls, &input);
        let third = injector.gather(&controls, &input);

        assert_eq!(first.secondary_pointer, None);
        assert_eq!(second.secondary_pointer, Some([10.0, 20.0]));
        assert_eq!(third.secondary_pointer, None);
    }

    #[test]
    fn test_scaled_delta_time() {
        let mut injector = InteractionInjector::new();
        let mut controls = PaintControls::default();
        controls.set_time_scale(2.5);
        let record = injector.gather(&controls, &input_at(0.0, 0.0, false, false));
        assert!((record.delta_time - 0.04).abs() < 1e-6);
    }

    #[test]
    fn test_strength_needs_a_button() {
        let mut injector = InteractionInjector::new();
        let controls = PaintControls::default();

        let idle = injector.gather(&controls, &input_at(5.0, 5.0, false, false));
        assert_eq!(idle.paint_strength, 0.0);

        let erase = injector.gather(&controls, &input_at(5.0, 5.0, false, true));
        assert_eq!(erase.paint_strength, controls.strength());
        assert!(erase.right_button);
    }

    #[test]
    fn test_pointer_outside_window_is_off_grid() {
        let mut injector = InteractionInjector::new();
        let record = injector.gather(&PaintControls::default(), &FrameInput::default());
        assert_eq!(record.pointer, OFF_GRID_POINTER);
    }

    #[test]
    fn test_mode_slot_values() {
        assert_eq!(PaintMode::Density.slot_value(), 0);
        assert_eq!(PaintMode::Velocity.slot_value(), 1);
        assert_eq!(PaintMode::Color.slot_value(), 2);
    }
}
