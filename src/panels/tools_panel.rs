use egui::color_picker::{color_edit_button_srgba, Alpha};
use egui::Slider;

use crate::PaintApp;
use crate::capture::PixelFormat;
use crate::history::ChangeKind;

pub fn tools_panel(app: &mut PaintApp, ctx: &egui::Context) {
    egui::SidePanel::left("tools_panel")
        .resizable(true)
        .default_width(200.0)
        .show(ctx, |ui| {
            ui.heading("Brush");
            ui.separator();

            let style = *app.session().style();

            ui.horizontal(|ui| {
                ui.label("Color:");
                let mut color = style.color();
                if color_edit_button_srgba(ui, &mut color, Alpha::Opaque).changed() {
                    app.session_mut().set_color(color);
                }
            });

            ui.horizontal(|ui| {
                ui.label("Width:");
                let mut width = style.width();
                if ui.add(Slider::new(&mut width, 1.0..=50.0)).changed() {
                    if let Err(err) = app.session_mut().set_stroke_width(width) {
                        log::warn!("{}", err);
                    }
                }
            });

            ui.horizontal(|ui| {
                ui.label("Opacity:");
                let mut opacity = style.opacity();
                if ui.add(Slider::new(&mut opacity, 0.0..=1.0)).changed() {
                    if let Err(err) = app.session_mut().set_opacity(opacity) {
                        log::warn!("{}", err);
                    }
                }
            });

            ui.horizontal(|ui| {
                ui.label("Background:");
                let mut background = app.session().history().background();
                if color_edit_button_srgba(ui, &mut background, Alpha::Opaque).changed() {
                    app.session_mut().set_background_color(background);
                    app.settings_mut().background = background;
                }
            });

            app.settings_mut().style = *app.session().style();

            ui.separator();

            // Undo/Redo section
            ui.horizontal(|ui| {
                let history = app.session().history();
                let can_undo = history.can_undo();
                let can_redo = history.can_redo();

                if ui.add_enabled(can_undo, egui::Button::new("Undo")).clicked() {
                    app.session_mut().undo();
                }
                if ui.add_enabled(can_redo, egui::Button::new("Redo")).clicked() {
                    app.session_mut().redo();
                }
                if ui.button("Clear").clicked() {
                    app.session_mut().reset();
                }
            });

            if let Some(change) = app.last_change() {
                let label = match change.kind {
                    ChangeKind::Inserted => format!("New stroke - {}", change.undo_count),
                    ChangeKind::Undo => format!("Undo - {}", change.undo_count),
                    ChangeKind::Redo => format!("Redo - {}", change.redo_count),
                    ChangeKind::Reset => "Cleared".to_owned(),
                    ChangeKind::Imported => format!("Opened - {}", change.undo_count),
                };
                ui.label(label);
                ui.label(format!("Strokes: {}  Redo: {}", change.undo_count, change.redo_count));
            }

            ui.separator();
            ui.heading("Export");

            let mut format = app.settings().capture_format;
            egui::ComboBox::from_label("Format")
                .selected_text(format.name())
                .show_ui(ui, |ui| {
                    for candidate in PixelFormat::ALL {
                        ui.selectable_value(&mut format, candidate, candidate.name());
                    }
                });
            app.settings_mut().capture_format = format;

            ui.label(format!("Folder: {}", app.settings().export_dir.display()));

            if ui.button("Export image").clicked() {
                app.request_export(ctx);
            }

            ui.horizontal(|ui| {
                if ui.button("Save drawing").clicked() {
                    app.save_drawing();
                }
                if ui.button("Open drawing").clicked() {
                    app.open_drawing();
                }
            });

            if let Some(status) = app.status() {
                ui.separator();
                ui.label(status);
            }
        });
}
