use crate::image_output::{save_png, to_color_image};
use crate::map::{read_map, HealpixMap};
use crate::render::{render_mollview, Graticule, MollviewParams, Norm, RenderedMap};
use crate::utils::format_value;
use eframe::egui;
use egui::TextureHandle;
use std::path::PathBuf;

/// Interactive full-sky map viewer.
pub struct MapViewerApp {
    map: Option<HealpixMap>,
    map_path: Option<PathBuf>,
    params: MollviewParams,
    // Values kept while the automatic bound is selected
    min_value: f64,
    max_value: f64,
    graticule: Graticule,
    rendered: Option<RenderedMap>,
    texture: Option<TextureHandle>,
    needs_render: bool,
    status: Option<String>,
}

impl MapViewerApp {
    pub fn new(map: Option<(PathBuf, HealpixMap)>, params: MollviewParams) -> Self {
        let (map_path, map) = match map {
            Some((path, map)) => (Some(path), Some(map)),
            None => (None, None),
        };
        Self {
            map,
            map_path,
            min_value: params.min.unwrap_or(1.0),
            max_value: params.max.unwrap_or(100.0),
            graticule: params.graticule.unwrap_or_default(),
            params,
            rendered: None,
            texture: None,
            needs_render: true,
            status: None,
        }
    }

    fn handle_open_map(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("HEALPix FITS", &["fits", "fit"])
            .pick_file()
        {
            match read_map(&path) {
                Ok(map) => {
                    self.map = Some(map);
                    self.map_path = Some(path);
                    self.needs_render = true;
                    self.status = None;
                }
                Err(e) => {
                    tracing::error!("Failed to load map: {}", e);
                    self.status = Some(e.user_message());
                }
            }
        }
    }

    fn handle_save_png(&mut self) {
        let Some(rendered) = &self.rendered else {
            return;
        };
        let default_name = self
            .map_path
            .as_ref()
            .and_then(|p| p.file_stem())
            .map(|stem| format!("{}.png", stem.to_string_lossy()))
            .unwrap_or_else(|| "map.png".to_string());

        if let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG", &["png"])
            .set_file_name(default_name)
            .save_file()
        {
            if let Err(e) = save_png(&rendered.image, &path) {
                tracing::error!("Failed to save image: {}", e);
                self.status = Some(e.to_string());
            }
        }
    }

    fn rerender(&mut self, ctx: &egui::Context) {
        self.needs_render = false;
        let Some(map) = &self.map else {
            return;
        };

        match render_mollview(map, &self.params) {
            Ok(rendered) => {
                let image = to_color_image(&rendered.image);
                self.texture =
                    Some(ctx.load_texture("mollview", image, egui::TextureOptions::LINEAR));
                self.rendered = Some(rendered);
                self.status = None;
            }
            Err(e) => {
                tracing::warn!("Render failed: {}", e);
                self.status = Some(e.to_string());
            }
        }
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui) {
        let before = self.params.clone();

        ui.horizontal(|ui| {
            let mut log = self.params.norm == Norm::Log;
            ui.checkbox(&mut log, "Log scale");
            self.params.norm = if log { Norm::Log } else { Norm::Linear };

            ui.separator();
            let mut fixed_min = self.params.min.is_some();
            ui.checkbox(&mut fixed_min, "Min");
            ui.add_enabled(
                fixed_min,
                egui::DragValue::new(&mut self.min_value).speed(0.1),
            );
            self.params.min = fixed_min.then_some(self.min_value);

            let mut fixed_max = self.params.max.is_some();
            ui.checkbox(&mut fixed_max, "Max");
            ui.add_enabled(
                fixed_max,
                egui::DragValue::new(&mut self.max_value).speed(1.0),
            );
            self.params.max = fixed_max.then_some(self.max_value);

            ui.separator();
            let mut grid = self.params.graticule.is_some();
            ui.checkbox(&mut grid, "Graticule");
            ui.add_enabled(
                grid,
                egui::DragValue::new(&mut self.graticule.dpar_deg)
                    .range(1.0..=90.0)
                    .suffix("° lat"),
            );
            ui.add_enabled(
                grid,
                egui::DragValue::new(&mut self.graticule.dmer_deg)
                    .range(1.0..=180.0)
                    .suffix("° lon"),
            );
            self.params.graticule = grid.then_some(self.graticule);
        });

        if self.params != before {
            self.needs_render = true;
        }
    }
}

impl eframe::App for MapViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("HEALPix Map Viewer");

                if ui.button("📂 Open Map").clicked() {
                    self.handle_open_map();
                }

                let can_save = self.rendered.is_some();
                if ui.add_enabled(can_save, egui::Button::new("💾 Save PNG")).clicked() {
                    self.handle_save_png();
                }
            });

            ui.separator();
            self.draw_controls(ui);
        });

        egui::TopBottomPanel::bottom("info_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some(map) = &self.map {
                    ui.label(format!(
                        "📦 nside {} · {} pixels · {}",
                        map.nside,
                        map.npix(),
                        map.ordering
                    ));
                    if let Some(coordsys) = map.coordsys {
                        ui.label(format!("🧭 {}", coordsys));
                    }
                } else {
                    ui.label("📦 No map loaded");
                }

                if let Some(rendered) = &self.rendered {
                    ui.separator();
                    ui.label(format!(
                        "🎨 {} … {} ({:?})",
                        format_value(rendered.scale.min),
                        format_value(rendered.scale.max),
                        rendered.scale.norm
                    ));
                }

                if let Some(path) = &self.map_path {
                    ui.separator();
                    ui.label(path.display().to_string());
                }
            });

            if let Some(status) = &self.status {
                ui.colored_label(egui::Color32::RED, status);
            }
        });

        if self.needs_render {
            self.rerender(ctx);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(texture) = &self.texture {
                egui::ScrollArea::both().show(ui, |ui| {
                    ui.add(egui::Image::new(texture).shrink_to_fit());
                });
            } else {
                ui.centered_and_justified(|ui| {
                    ui.label("🗺 Open a HEALPix map to display it.");
                });
            }
        });
    }
}
