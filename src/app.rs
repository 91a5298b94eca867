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

//! The eframe application.
//!
//! The UI thread owns the [`Session`]. Each frame it drains worker results,
//! draws the map and panels, then feeds clicks and panel changes back into the
//! session as events.

use eframe::egui;
use log::{info, warn};
use sheetmap_core::{ControlPanel, Effect, FeedKind, Outcome, Session, SessionEvent};

use crate::config::AppConfig;
use crate::feeds::FeedSource;
use crate::location::LocationProvider;
use crate::map::{MapClick, MapInteraction, MapView};
use crate::ui::{FilterPanelWindow, NoticeBoard, Sidebar};
use crate::worker::{Job, Worker};

const USER_AGENT: &str = concat!("sheetmap-desktop/", env!("CARGO_PKG_VERSION"));

#[derive(Debug)]
pub struct SheetMapApp {
    session: Session,
    panel: ControlPanel,
    map: MapView,
    worker: Worker,
    sidebar: Sidebar,
    notices: NoticeBoard,
    filter_window: FilterPanelWindow,
    geometry_feed: FeedSource,
    points_feed: FeedSource,
}

impl SheetMapApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: &AppConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to configure HTTP client, using defaults: {}", e);
                reqwest::Client::new()
            });

        let locator = LocationProvider::new(client.clone(), config);
        let worker = Worker::spawn(cc.egui_ctx.clone(), client, locator);

        let session = Session::new(config.filter_state(), config.fix_options());
        let panel = ControlPanel::new(session.filter().state());

        let mut app = Self {
            session,
            panel,
            map: MapView::new(&cc.egui_ctx, config.initial_center(), config.initial_zoom),
            worker,
            sidebar: Sidebar::new(config.sidebar_width),
            notices: NoticeBoard::default(),
            filter_window: FilterPanelWindow::default(),
            geometry_feed: FeedSource::parse(&config.geometry_feed),
            points_feed: FeedSource::parse(&config.points_feed),
        };

        app.load_feeds();
        let outcome = app.session.start(app.map.markers_mut());
        app.apply_outcome(outcome);
        app
    }

    fn load_feeds(&self) {
        info!("Loading feeds");
        self.worker.submit(Job::LoadFeed {
            kind: FeedKind::Geometry,
            source: self.geometry_feed.clone(),
        });
        self.worker.submit(Job::LoadFeed {
            kind: FeedKind::Points,
            source: self.points_feed.clone(),
        });
    }

    fn dispatch(&mut self, event: SessionEvent) {
        let outcome = self.session.handle(event, self.map.markers_mut());
        self.apply_outcome(outcome);
    }

    fn apply_outcome(&mut self, outcome: Outcome) {
        for notice in outcome.notices {
            self.notices.push(notice);
        }
        for effect in outcome.effects {
            match effect {
                Effect::RequestFix(request) => self.worker.submit(Job::Locate(request)),
                Effect::CenterMap {
                    position,
                    accuracy_meters,
                    max_zoom,
                } => self.map.center_on(position, accuracy_meters, max_zoom),
            }
        }
    }

    fn handle_map_interaction(&mut self, interaction: MapInteraction) {
        self.session
            .geometry_mut()
            .set_hovered(interaction.hovered_geometry);

        match interaction.click {
            Some(MapClick::Marker(id)) => {
                if let Some(record) = self.session.dataset().get(id) {
                    self.sidebar.show_details(&record.display_name, &record.description);
                }
                self.session.geometry_mut().set_selected(None);
            }
            Some(MapClick::Geometry(index)) => {
                if let Some(feature) = self.session.geometry().get(index) {
                    self.sidebar.show_details(feature.name(), feature.description());
                }
                self.session.geometry_mut().set_selected(Some(index));
            }
            Some(MapClick::Empty(point)) => {
                self.sidebar.close();
                self.session.geometry_mut().set_selected(None);
                self.dispatch(SessionEvent::MapClicked(point));
            }
            None => {}
        }
    }
}

impl eframe::App for SheetMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        for event in self.worker.drain() {
            self.dispatch(event);
        }

        let counts = self.session.filter().last_counts();
        let reload = self.filter_window.render(ctx, &mut self.panel, counts);

        self.sidebar.render(ctx);

        let interaction = egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.map.show(ui, &self.session))
            .inner;

        self.notices.render(ctx);

        self.handle_map_interaction(interaction);

        for intent in self.panel.take_intents(self.session.filter().state()) {
            self.dispatch(SessionEvent::ControlChanged(intent));
        }

        if reload {
            self.load_feeds();
        }
    }
}
