use std::ops::RangeInclusive;

use egui::{Slider, SliderClamping, Ui};
use glam::Vec3;

use crate::renderer::postprocess::PostKernel;
use crate::scene::{FrameState, ModelTransform};
use crate::time::FrameTimer;

const LIGHT_RANGE: RangeInclusive<f32> = -25.0..=25.0;
const AXIS_RANGE: RangeInclusive<f32> = 0.0..=1.0;
const TRANSLATE_RANGE: RangeInclusive<f32> = -100.0..=100.0;
const ANGLE_RANGE: RangeInclusive<f32> = 0.0..=360.0;
const SCALE_RANGE: RangeInclusive<f32> = 0.01..=10.0;
const FLOOR_TRANSLATE_RANGE: RangeInclusive<f32> = -60.0..=-40.0;

/// Live editor for the frame state: lights, transforms, clear color and the
/// post-processing kernel.
pub struct ParametersWindow {
    open: bool,
}

impl ParametersWindow {
    pub fn new() -> Self {
        Self { open: true }
    }

    pub fn show(&mut self, ctx: &egui::Context, state: &mut FrameState, timer: &FrameTimer, draws: usize) {
        egui::Window::new("Transformations")
            .default_width(320.0)
            .open(&mut self.open)
            .show(ctx, |ui| {
                lights_section(ui, state);
                ui.separator();
                let always = SliderClamping::Always;
                transform_section(ui, "House", &mut state.house, TRANSLATE_RANGE, always);
                transform_section(ui, "Character", &mut state.character, TRANSLATE_RANGE, always);
                // the default floor x sits outside the slider range
                let never = SliderClamping::Never;
                transform_section(ui, "Floor", &mut state.floor, FLOOR_TRANSLATE_RANGE, never);
                ui.separator();
                render_section(ui, state);
                ui.separator();
                ui.label(format!(
                    "Application average {:.3} ms/frame ({:.1} FPS), {} draws",
                    timer.average_frame_ms(),
                    timer.average_fps(),
                    draws
                ));
            });
    }
}

impl Default for ParametersWindow {
    fn default() -> Self {
        Self::new()
    }
}

fn lights_section(ui: &mut Ui, state: &mut FrameState) {
    ui.checkbox(&mut state.animate_lights, "Animate lights");
    for (index, position) in state.point_light_positions.iter_mut().enumerate() {
        vec3_sliders(ui, &format!("Light {index}"), position, LIGHT_RANGE, SliderClamping::Always);
    }
}

fn transform_section(
    ui: &mut Ui,
    name: &str,
    transform: &mut ModelTransform,
    translate_range: RangeInclusive<f32>,
    clamping: SliderClamping,
) {
    egui::CollapsingHeader::new(name)
        .default_open(true)
        .show(ui, |ui| {
            vec3_sliders(ui, "Rotate axis", &mut transform.rotation_axis, AXIS_RANGE, SliderClamping::Always);
            vec3_sliders(ui, "Translate", &mut transform.translation, translate_range, clamping);
            ui.add(Slider::new(&mut transform.rotation_degrees, ANGLE_RANGE).text("Rotate angle"));
            ui.add(
                Slider::new(&mut transform.scale, SCALE_RANGE)
                    .logarithmic(true)
                    .text("Scale"),
            );
        });
}

fn render_section(ui: &mut Ui, state: &mut FrameState) {
    ui.horizontal(|ui| {
        ui.label("Clear color");
        ui.color_edit_button_rgba_unmultiplied(&mut state.clear_color);
    });

    egui::ComboBox::from_label("Post-processing")
        .selected_text(state.kernel.label())
        .show_ui(ui, |ui| {
            for kernel in PostKernel::ALL {
                ui.selectable_value(&mut state.kernel, kernel, kernel.label());
            }
        });

    ui.checkbox(&mut state.shadows_enabled, "Shadows");
    ui.horizontal(|ui| {
        let mut enabled = state.camera_movement_enabled;
        if ui.checkbox(&mut enabled, "Camera movement (Left Ctrl)").changed() {
            state.toggle_camera_movement();
        }
    });
}

fn vec3_sliders(
    ui: &mut Ui,
    label: &str,
    value: &mut Vec3,
    range: RangeInclusive<f32>,
    clamping: SliderClamping,
) {
    ui.horizontal(|ui| {
        for component in [&mut value.x, &mut value.y, &mut value.z] {
            ui.add(
                Slider::new(component, range.clone())
                    .clamping(clamping)
                    .show_value(true),
            );
        }
        ui.label(label);
    });
}
