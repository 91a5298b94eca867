// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod app;
mod config;
mod feeds;
mod location;
mod map;
mod ui;
mod worker;

use eframe::egui;
use log::{info, warn};
use mimalloc::MiMalloc;

use app::SheetMapApp;
use config::AppConfig;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<(), eframe::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting SheetMap Desktop...");

    let config = AppConfig::load_or_default();
    match AppConfig::get_config_path() {
        Ok(path) => info!("Configuration file: {}", path.display()),
        Err(e) => warn!("Could not resolve configuration path: {}", e),
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 800.0])
            .with_title("SheetMap Desktop"),
        ..Default::default()
    };

    info!("Initializing window...");
    eframe::run_native(
        "SheetMap Desktop",
        options,
        Box::new(move |cc| {
            info!("Creating application...");
            Ok(Box::new(SheetMapApp::new(cc, &config)))
        }),
    )
}
