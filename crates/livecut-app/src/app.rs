// crates/livecut-app/src/app.rs
//
// The preview surface: one egui window with the tiled all-feeds view and the
// elected program feed side by side. Frames arrive over a crossbeam channel
// from the preview sink workers; this module drains it each repaint and
// uploads textures. Escape raises the shared halt flag, which stops the
// selector's ticker and then closes this window.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;

use livecut_core::frame::PreviewEvent;

use crate::pipeline::PROGRAM_WINDOW;

pub struct LivecutApp {
    events:   Receiver<PreviewEvent>,
    halt:     Arc<AtomicBool>,
    /// Latest texture per preview window, replaced in place on every frame.
    textures: HashMap<String, egui::TextureHandle>,
    /// Window names in first-seen order so the layout is stable.
    order:    Vec<String>,
}

impl LivecutApp {
    pub fn new(events: Receiver<PreviewEvent>, halt: Arc<AtomicBool>) -> Self {
        Self {
            events,
            halt,
            textures: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn ingest_preview_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.events.try_recv() {
            let PreviewEvent::Frame { window, frame } = event;
            let image = egui::ColorImage::from_rgb(
                [frame.width as usize, frame.height as usize],
                &frame.data,
            );
            let tex = ctx.load_texture(window.clone(), image, egui::TextureOptions::LINEAR);
            if !self.textures.contains_key(&window) {
                self.order.push(window.clone());
            }
            self.textures.insert(window, tex);
        }
    }
}

impl eframe::App for LivecutApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ingest_preview_events(ctx);

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.halt.store(true, Ordering::Relaxed);
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
        if self.halt.load(Ordering::Relaxed) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.textures.is_empty() {
                ui.centered_and_justified(|ui| {
                    ui.label("waiting for feeds… (Esc quits)");
                });
                return;
            }

            // Program feed first, then the rest in first-seen order.
            let mut names: Vec<&String> = self.order.iter().collect();
            names.sort_by_key(|n| n.as_str() != PROGRAM_WINDOW);

            let cols = names.len().clamp(1, 2);
            let cell_w = ui.available_width() / cols as f32 - 8.0;
            ui.horizontal_wrapped(|ui| {
                for name in names {
                    if let Some(tex) = self.textures.get(name) {
                        ui.vertical(|ui| {
                            ui.label(egui::RichText::new(name.as_str()).small().strong());
                            let size = tex.size_vec2();
                            let scale = (cell_w / size.x).min(1.0);
                            ui.image((tex.id(), size * scale));
                        });
                    }
                }
            });
        });

        // The pipeline produces frames whether or not egui has focus — keep
        // repainting at roughly the media cadence.
        ctx.request_repaint_after(Duration::from_millis(33));
    }
}
