//! Enhanced TV
//! Desktop IPTV channel browser: loads M3U playlists, guesses each channel's country
//! and hands streams to an external player

// Hide console window on Windows release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

// Use mimalloc for faster memory allocation (Linux, macOS)
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use eframe::egui;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod channel_index;
mod config;
mod countries;
mod error;
mod extinf;
mod loader;
mod m3u_parser;
mod models;
mod player;
mod store;

use channel_index::{adjacent, ChannelFilter, ChannelIndex};
use config::AppConfig;
use error::FetchError;
use loader::{CancelToken, PlaylistLoader, PlaylistSource};
use models::{ChannelRecord, CountrySelector};
use player::ExternalPlayer;
use store::{FavoritesStore, SettingsStore};

const VOLUME_STEP: i64 = 10;

/// Key bindings shown in the Ctrl+H help window
const SHORTCUTS: &[(&str, &str)] = &[
    ("Space", "Play / stop the selected channel"),
    ("Up", "Volume up"),
    ("Down", "Volume down"),
    ("Left", "Previous channel"),
    ("Right", "Next channel"),
    ("Enter", "Play the selected channel"),
    ("Ctrl+T", "Toggle dark / light theme"),
    ("Ctrl+H", "Show this help"),
];

/// Background task messages. `load_id` lets results of a superseded load be dropped.
enum TaskResult {
    Progress {
        load_id: u64,
        downloaded: u64,
        total: Option<u64>,
    },
    PlaylistLoaded {
        load_id: u64,
        source: String,
        index: ChannelIndex,
    },
    LoadFailed {
        load_id: u64,
        error: FetchError,
    },
}

/// Deferred list interaction, applied once the list is no longer borrowed
enum ListAction {
    Select(String),
    Play(String),
    ToggleFavorite(String),
}

fn main() -> Result<(), eframe::Error> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("enhanced_tv=info")))
        .init();

    info!("Starting Enhanced TV v{}", env!("CARGO_PKG_VERSION"));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 700.0])
            .with_min_inner_size([640.0, 400.0]),
        vsync: true,
        hardware_acceleration: eframe::HardwareAcceleration::Preferred,
        ..Default::default()
    };

    eframe::run_native(
        "Enhanced TV",
        options,
        Box::new(|cc| Ok(Box::new(TvApp::new(cc)))),
    )
}

struct TvApp {
    config: AppConfig,
    favorites: FavoritesStore,
    settings: SettingsStore,

    // Playlist state
    index: ChannelIndex,
    filter: ChannelFilter,
    favorites_only: bool,
    show_help: bool,
    source_input: String,
    selected: Option<String>,
    playing: Option<String>,
    player: ExternalPlayer,

    // Background loading
    load_id: u64,
    loading: bool,
    cancel: Option<CancelToken>,
    progress: Option<(u64, Option<u64>)>,
    status_message: String,

    task_sender: Sender<TaskResult>,
    task_receiver: Receiver<TaskResult>,
}

impl TvApp {
    fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let config = AppConfig::load();
        let favorites = FavoritesStore::open_default();
        let settings = SettingsStore::open_default();
        let (task_sender, task_receiver) = channel();

        let mut app = Self {
            filter: ChannelFilter {
                query: String::new(),
                country: CountrySelector::parse(&config.country_filter),
            },
            source_input: config.playlist_url.clone(),
            selected: settings.last_channel().map(str::to_string),
            config,
            favorites,
            settings,
            index: ChannelIndex::default(),
            favorites_only: false,
            show_help: false,
            playing: None,
            player: ExternalPlayer::default(),
            load_id: 0,
            loading: false,
            cancel: None,
            progress: None,
            status_message: "Ready".to_string(),
            task_sender,
            task_receiver,
        };

        // Load the last playlist right away
        app.start_load(&cc.egui_ctx);
        app
    }

    fn start_load(&mut self, ctx: &egui::Context) {
        let input = self.source_input.trim();
        if input.is_empty() {
            self.status_message = "Enter a playlist URL or file path".to_string();
            return;
        }

        if let Some(previous) = self.cancel.take() {
            previous.cancel();
        }

        let source = PlaylistSource::parse(input);
        let cancel = CancelToken::new();
        self.load_id += 1;
        self.cancel = Some(cancel.clone());
        self.loading = true;
        self.progress = None;
        self.status_message = format!("Loading {}...", source);

        let load_id = self.load_id;
        let fetch_config = self.config.fetch_config();
        let sender = self.task_sender.clone();
        let ctx = ctx.clone();

        thread::spawn(move || {
            let progress_sender = sender.clone();
            let progress_ctx = ctx.clone();
            let loader = PlaylistLoader::new(fetch_config).with_progress(Box::new(
                move |downloaded, total| {
                    let _ = progress_sender.send(TaskResult::Progress {
                        load_id,
                        downloaded,
                        total,
                    });
                    progress_ctx.request_repaint();
                },
            ));

            // The index is built here so the UI only ever swaps in a finished one
            let result = match loader.load(&source, &cancel) {
                Ok(channels) => TaskResult::PlaylistLoaded {
                    load_id,
                    source: source.to_string(),
                    index: ChannelIndex::new(channels),
                },
                Err(error) => TaskResult::LoadFailed { load_id, error },
            };
            let _ = sender.send(result);
            ctx.request_repaint();
        });
    }

    fn cancel_load(&mut self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
            self.status_message = format!(
                "Cancelling (may wait up to {}s for the server to answer)...",
                self.config.fetch_config().response_timeout_secs
            );
        }
    }

    fn handle_task(&mut self, result: TaskResult) {
        match result {
            TaskResult::Progress { load_id, downloaded, total } if load_id == self.load_id => {
                self.progress = Some((downloaded, total));
            }
            TaskResult::PlaylistLoaded { load_id, source, index } if load_id == self.load_id => {
                self.finish_load();
                self.status_message = format!(
                    "Loaded {} channels ({} countries) from {}",
                    index.len(),
                    index.countries().len(),
                    source
                );
                self.index = index;

                // A stale country choice would hide every channel
                if !self.index.country_options().contains(&self.filter.country) {
                    self.filter.country = CountrySelector::All;
                }
                if self
                    .selected
                    .as_deref()
                    .is_some_and(|url| self.index.find_by_url(url).is_none())
                {
                    self.selected = None;
                }

                self.config.playlist_url = source;
                self.config.country_filter = self.filter.country.as_setting();
                self.config.save();
            }
            TaskResult::LoadFailed { load_id, error } if load_id == self.load_id => {
                self.finish_load();
                self.status_message = match error {
                    FetchError::Cancelled => {
                        format!("Load cancelled, keeping {} channels", self.index.len())
                    }
                    error => {
                        error!(error = %error, "Playlist load failed");
                        format!(
                            "Failed to load playlist: {} (keeping {} channels)",
                            error,
                            self.index.len()
                        )
                    }
                };
            }
            _ => {} // Superseded load
        }
    }

    fn finish_load(&mut self) {
        self.loading = false;
        self.cancel = None;
        self.progress = None;
    }

    fn visible_channels(&self) -> Vec<&ChannelRecord> {
        let mut visible = self.index.filter(&self.filter);
        if self.favorites_only {
            visible.retain(|c| self.favorites.contains(c.url()));
        }
        visible
    }

    fn play(&mut self, url: &str) {
        let Some(channel) = self.index.find_by_url(url) else {
            return;
        };

        let player = self.config.player().to_string();
        let user_agent = self
            .config
            .pass_user_agent_to_player
            .then_some(self.config.user_agent.as_str());
        let args = player::command_args(&player, channel, self.settings.volume(), user_agent);
        let title = channel.title().to_string();

        match self.player.play(&player, &args) {
            Ok(_) => {
                self.selected = Some(url.to_string());
                self.playing = Some(url.to_string());
                self.settings.set_last_channel(Some(url));
                self.persist_settings();
                self.status_message = format!("Playing {}", title);
            }
            Err(e) => {
                error!(player = %player, error = %e, "Failed to start player");
                self.status_message = format!("Failed to start {}: {}", player, e);
            }
        }
    }

    fn stop(&mut self) {
        self.player.stop();
        self.playing = None;
        self.status_message = "Stopped".to_string();
    }

    /// Play the previous or next visible channel
    fn step_channel(&mut self, step: isize) {
        let current = self.playing.as_deref().or(self.selected.as_deref());
        let target = adjacent(&self.visible_channels(), current, step).map(|c| c.url().to_string());
        if let Some(url) = target {
            self.play(&url);
        }
    }

    fn toggle_favorite(&mut self, url: &str) {
        let added = self.favorites.toggle(url);
        if let Err(e) = self.favorites.persist() {
            warn!(error = %e, "Failed to save favorites");
        }
        self.status_message = if added {
            "Added to favorites".to_string()
        } else {
            "Removed from favorites".to_string()
        };
    }

    fn set_volume(&mut self, volume: i64) {
        self.settings.set_volume(volume);
        self.persist_settings();
        self.status_message = format!("Volume {} (applies to the next stream)", self.settings.volume());
    }

    fn nudge_volume(&mut self, delta: i64) {
        let volume = self.settings.step_volume(delta);
        self.persist_settings();
        self.status_message = format!("Volume {} (applies to the next stream)", volume);
    }

    fn persist_settings(&mut self) {
        if let Err(e) = self.settings.persist() {
            warn!(error = %e, "Failed to save settings");
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.input(|i| i.modifiers.ctrl && i.key_pressed(egui::Key::H)) {
            self.show_help = !self.show_help;
        }

        // Arrow keys belong to the text field while typing
        if ctx.wants_keyboard_input() {
            return;
        }

        let (up, down, left, right, enter, space, theme) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::ArrowUp),
                i.key_pressed(egui::Key::ArrowDown),
                i.key_pressed(egui::Key::ArrowLeft),
                i.key_pressed(egui::Key::ArrowRight),
                i.key_pressed(egui::Key::Enter),
                i.key_pressed(egui::Key::Space),
                i.modifiers.ctrl && i.key_pressed(egui::Key::T),
            )
        });

        if up {
            self.nudge_volume(VOLUME_STEP);
        }
        if down {
            self.nudge_volume(-VOLUME_STEP);
        }
        if left {
            self.step_channel(-1);
        }
        if right {
            self.step_channel(1);
        }
        if enter {
            if let Some(url) = self.selected.clone() {
                self.play(&url);
            }
        }
        if space {
            if self.playing.is_some() {
                self.stop();
            } else if let Some(url) = self.selected.clone() {
                self.play(&url);
            }
        }
        if theme {
            self.config.dark_mode = !self.config.dark_mode;
            self.config.save();
        }
    }

    fn show_help_window(&mut self, ctx: &egui::Context) {
        egui::Window::new("⌨ Keyboard Shortcuts")
            .open(&mut self.show_help)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                egui::Grid::new("shortcuts_grid")
                    .num_columns(2)
                    .spacing([24.0, 6.0])
                    .striped(true)
                    .show(ui, |ui| {
                        for (key, action) in SHORTCUTS {
                            ui.strong(*key);
                            ui.label(*action);
                            ui.end_row();
                        }
                    });
            });
    }

    fn show_top_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.add_space(5.0);

            ui.horizontal(|ui| {
                ui.label("📺 Playlist:");
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.source_input)
                        .hint_text("https://... or /path/to/playlist.m3u")
                        .desired_width(420.0),
                );
                let submitted =
                    response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

                if ui.add_enabled(!self.loading, egui::Button::new("🔄 Load")).clicked() || submitted {
                    self.start_load(ui.ctx());
                }

                if ui.button("📁").on_hover_text("Open a local playlist file").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .set_title("Open Playlist")
                        .add_filter("Playlists", &["m3u", "m3u8", "gz"])
                        .add_filter("All Files", &["*"])
                        .pick_file()
                    {
                        self.source_input = path.display().to_string();
                        self.start_load(ui.ctx());
                    }
                }

                if self.loading && ui.button("✖ Cancel").clicked() {
                    self.cancel_load();
                }

                ui.separator();

                if ui.checkbox(&mut self.config.dark_mode, "🌙 Dark").changed() {
                    self.config.save();
                }

                if ui.button("⌨").on_hover_text("Keyboard shortcuts (Ctrl+H)").clicked() {
                    self.show_help = true;
                }
            });

            ui.horizontal(|ui| {
                ui.label("🔍");
                ui.add(
                    egui::TextEdit::singleline(&mut self.filter.query)
                        .hint_text("Search channels")
                        .desired_width(220.0),
                );

                let before = self.filter.country.clone();
                egui::ComboBox::from_id_salt("country_filter")
                    .selected_text(self.filter.country.label())
                    .width(200.0)
                    .show_ui(ui, |ui| {
                        for option in self.index.country_options() {
                            let label = option.label();
                            ui.selectable_value(&mut self.filter.country, option, label);
                        }
                    });
                if self.filter.country != before {
                    self.config.country_filter = self.filter.country.as_setting();
                    self.config.save();
                }

                ui.checkbox(&mut self.favorites_only, "★ Favorites");

                ui.separator();

                let mut volume = self.settings.volume();
                if ui
                    .add(egui::Slider::new(&mut volume, 0..=100).text("🔊"))
                    .on_hover_text("Volume for the next stream (Up/Down)")
                    .changed()
                {
                    self.set_volume(volume as i64);
                }
            });

            ui.add_space(5.0);
        });
    }

    fn show_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("bottom_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.loading {
                    ui.spinner();
                    if let Some((downloaded, total)) = self.progress {
                        ui.label(format_progress(downloaded, total));
                    }
                }
                ui.label(&self.status_message);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if let Some(channel) = self.playing.as_deref().and_then(|u| self.index.find_by_url(u)) {
                        ui.label(format!("▶ {} [{}]", channel.title(), channel.country_code()));
                        ui.separator();
                    }
                    ui.label(format!("{} channels", self.index.len()));
                });
            });
        });
    }

    fn show_channel_list(&mut self, ctx: &egui::Context) {
        let mut action = None;

        egui::CentralPanel::default().show(ctx, |ui| {
            let visible = self.visible_channels();

            if visible.is_empty() {
                ui.vertical_centered(|ui| {
                    ui.add_space(60.0);
                    if self.loading && self.index.is_empty() {
                        ui.label("Loading playlist...");
                    } else {
                        ui.label("No channels found.");
                    }
                });
                return;
            }

            if self.filter.is_active() || self.favorites_only {
                ui.label(format!("{} of {} channels", visible.len(), self.index.len()));
            }

            let row_height = ui.spacing().interact_size.y;
            egui::ScrollArea::vertical()
                .id_salt("channels_scroll")
                .auto_shrink([false, false])
                .show_rows(ui, row_height, visible.len(), |ui, rows| {
                    ui.set_min_width(ui.available_width());
                    for channel in &visible[rows] {
                        let url = channel.url();
                        ui.horizontal(|ui| {
                            let star = if self.favorites.contains(url) { "★" } else { "☆" };
                            if ui.small_button(star).on_hover_text("Toggle favorite").clicked() {
                                action = Some(ListAction::ToggleFavorite(url.to_string()));
                            }

                            let marker = if self.playing.as_deref() == Some(url) { "▶ " } else { "" };
                            let label = format!("{}{} [{}]", marker, channel.title(), channel.country_code());
                            let is_selected = self.selected.as_deref() == Some(url);
                            let response = ui
                                .selectable_label(is_selected, label)
                                .on_hover_text(format!("{}\n{}", channel.country_name(), url));

                            if response.double_clicked() {
                                action = Some(ListAction::Play(url.to_string()));
                            } else if response.clicked() {
                                action = Some(ListAction::Select(url.to_string()));
                            }
                        });
                    }
                });
        });

        match action {
            Some(ListAction::Select(url)) => self.selected = Some(url),
            Some(ListAction::Play(url)) => self.play(&url),
            Some(ListAction::ToggleFavorite(url)) => self.toggle_favorite(&url),
            None => {}
        }
    }
}

impl eframe::App for TvApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Process background task results (non-blocking)
        while let Ok(result) = self.task_receiver.try_recv() {
            self.handle_task(result);
        }

        if self.playing.is_some() && !self.player.is_running() {
            self.playing = None;
        }

        self.handle_shortcuts(ctx);

        // Apply theme
        if self.config.dark_mode {
            ctx.set_visuals(egui::Visuals::dark());
        } else {
            ctx.set_visuals(egui::Visuals::light());
        }

        self.show_top_panel(ctx);
        self.show_status_bar(ctx);
        self.show_channel_list(ctx);
        self.show_help_window(ctx);
    }
}

fn format_progress(downloaded: u64, total: Option<u64>) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    match total {
        Some(total) if total > 0 => format!(
            "{:.1} / {:.1} MB ({:.0}%)",
            downloaded as f64 / MB,
            total as f64 / MB,
            downloaded as f64 * 100.0 / total as f64
        ),
        _ => format!("{:.1} MB", downloaded as f64 / MB),
    }
}
