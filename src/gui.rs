// src/gui.rs
use crate::drivers::registry::default_channel_name;
use crate::drivers::{Channel, MAX_MAX_POINTS, MIN_MAX_POINTS};
use crate::engine::PlotterEngine;
use crate::serial::{self, RetryPolicy, SerialPortOpener};
use crate::settings::{Settings, SettingsStore};
use crate::types::*;
use eframe::egui;
use egui::{Color32, RichText};
use egui_plot::{Legend, Line, Plot, PlotPoints};

// 通道面板里产生的操作，等绘制结束后统一交给 registry
enum ChannelAction {
    SetVisible(usize, bool),
    StartRename(usize),
    Rename(usize, String),
    Remove(usize),
}

struct RenameDraft {
    index: usize,
    text: String,
    focused: bool,
}

pub struct PlotterApp {
    // 核心状态
    engine: PlotterEngine,
    store: SettingsStore,
    settings: Settings,

    // 控件输入
    available_ports: Vec<String>,
    max_points_input: String,
    renaming: Option<RenameDraft>,

    // 状态栏 / 日志
    status: String,
    log_messages: Vec<String>,
}

impl PlotterApp {
    pub fn new(store: SettingsStore) -> Self {
        let settings = store.load();
        let (mut engine, startup_error) = match PlotterEngine::new(settings.max_points) {
            Ok(engine) => (engine, None),
            Err(err) => (PlotterEngine::default(), Some(err)),
        };
        engine
            .registry_mut()
            .restore_from(&settings.checkbox_names, &settings.checkbox_states);

        let mut app = Self {
            max_points_input: engine.buffer().max_points().to_string(),
            engine,
            store,
            settings,
            available_ports: Vec::new(),
            renaming: None,
            status: String::new(),
            log_messages: vec!["Serial Plotter ready.".to_owned()],
        };
        app.refresh_ports();
        if let Some(err) = startup_error {
            app.report(err);
        }
        app
    }

    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > 8 {
            self.log_messages.remove(0);
        }
    }

    // 所有错误都汇总到这里：写日志 + 显示在状态栏
    fn report(&mut self, err: impl std::fmt::Display) {
        let msg = format!("Error: {err}");
        log::warn!("{msg}");
        self.status = msg.clone();
        self.log(&msg);
    }

    fn notify(&mut self, msg: &str) {
        log::info!("{msg}");
        self.status = msg.to_owned();
        self.log(msg);
    }

    fn refresh_ports(&mut self) {
        self.available_ports = serial::available_ports();
        self.settings.port = pick_port(&self.settings.port, &self.available_ports);
    }

    fn persist(&mut self) {
        self.settings.max_points = self.engine.buffer().max_points();
        let (names, states) = self.engine.registry().snapshot();
        self.settings.checkbox_names = names;
        self.settings.checkbox_states = states;
        if let Err(err) = self.store.save(&self.settings) {
            self.report(err);
        }
    }

    fn toggle_connection(&mut self) {
        if self.engine.is_connected() {
            self.engine.disconnect();
            self.notify("Disconnected");
            return;
        }
        let target = self.settings.csv_enabled.then(|| self.settings.csv_path());
        self.engine.set_csv_target(target);
        let port = self.settings.port.clone();
        match self.engine.connect(
            &SerialPortOpener,
            &port,
            self.settings.baud,
            RetryPolicy::default(),
        ) {
            Ok(()) => {
                let msg = format!("Connected: {} @ {}", port, self.settings.baud);
                self.notify(&msg);
            }
            Err(err @ crate::drivers::PlotterError::Open { .. }) => {
                self.report(format!(
                    "{err}\nTry closing other programs using this port or restart your computer."
                ));
            }
            Err(err) => self.report(err),
        }
    }

    fn toggle_running(&mut self) {
        // 暂停时可能改过 CSV 设置
        if !self.engine.state().is_running() {
            let target = self.settings.csv_enabled.then(|| self.settings.csv_path());
            self.engine.set_csv_target(target);
        }
        if let Err(err) = self.engine.toggle_running() {
            self.report(err);
        }
    }

    fn apply_max_points(&mut self) {
        match self.max_points_input.trim().parse::<usize>() {
            Ok(n) => match self.engine.set_max_points(n) {
                Ok(()) => self.settings.max_points = n,
                Err(err) => self.report(err),
            },
            Err(_) => {
                self.report(format!(
                    "max data points must be a number between {MIN_MAX_POINTS} and {MAX_MAX_POINTS}"
                ));
            }
        }
        self.max_points_input = self.engine.buffer().max_points().to_string();
    }

    fn select_csv_folder(&mut self) {
        if let Some(folder) = rfd::FileDialog::new().pick_folder() {
            self.settings.csv_folder = Some(folder.display().to_string());
        }
    }

    fn restore_default(&mut self) {
        if let Err(err) = self.store.clear() {
            self.report(err);
        }
        self.settings = self.store.load();
        self.engine.clear();
        self.engine.registry_mut().clear_all();
        if let Err(err) = self.engine.set_max_points(self.settings.max_points) {
            self.report(err);
        }
        self.max_points_input = self.settings.max_points.to_string();
        self.renaming = None;
        self.refresh_ports();
        self.notify("Default settings restored");
    }

    fn apply_channel_actions(&mut self, actions: Vec<ChannelAction>) {
        let mut dirty = false;
        for action in actions {
            match action {
                ChannelAction::SetVisible(index, visible) => {
                    self.engine.registry_mut().set_visible(index, visible);
                }
                ChannelAction::StartRename(index) => {
                    if let Some(channel) = self.engine.registry().get(index) {
                        self.renaming = Some(RenameDraft {
                            index,
                            text: channel.name.clone(),
                            focused: false,
                        });
                    }
                }
                ChannelAction::Rename(index, name) => {
                    self.engine.registry_mut().rename(index, name);
                    self.renaming = None;
                    dirty = true;
                }
                ChannelAction::Remove(index) => {
                    self.engine.registry_mut().remove(index);
                    if matches!(&self.renaming, Some(draft) if draft.index == index) {
                        self.renaming = None;
                    }
                    dirty = true;
                }
            }
        }
        if dirty {
            self.persist();
        }
    }

    fn show_connection(&mut self, ui: &mut egui::Ui) {
        let connected = self.engine.is_connected();
        ui.add_enabled_ui(!connected, |ui| {
            let selected = if self.settings.port.is_empty() {
                "Select Port".to_owned()
            } else {
                self.settings.port.clone()
            };
            let combo = egui::ComboBox::from_id_source("port_combo")
                .selected_text(selected)
                .width(180.0)
                .show_ui(ui, |ui| {
                    for port in &self.available_ports {
                        ui.selectable_value(&mut self.settings.port, port.clone(), port.as_str());
                    }
                });
            // 打开下拉框时重新扫描端口
            if combo.response.clicked() {
                self.refresh_ports();
            }
            egui::ComboBox::from_id_source("baud_combo")
                .selected_text(self.settings.baud.to_string())
                .width(180.0)
                .show_ui(ui, |ui| {
                    for baud in BAUD_RATES {
                        ui.selectable_value(&mut self.settings.baud, baud, baud.to_string());
                    }
                });
        });

        let btn_txt = if connected { "Disconnect" } else { "Connect" };
        if ui.button(btn_txt).clicked() {
            self.toggle_connection();
        }
        if ui.button("Clear").clicked() {
            self.engine.clear();
        }
        let run_txt = if self.engine.state().is_running() { "Stop" } else { "Run" };
        if ui.add_enabled(connected, egui::Button::new(run_txt)).clicked() {
            self.toggle_running();
        }

        ui.horizontal(|ui| {
            ui.label("Max data points:");
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.max_points_input).desired_width(60.0),
            );
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                self.apply_max_points();
            }
        });
    }

    fn show_csv_settings(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.label(RichText::new("CSV Settings").strong());
            ui.add_enabled_ui(!self.engine.state().is_running(), |ui| {
                ui.checkbox(&mut self.settings.csv_enabled, "Log to CSV");
                ui.label("File Name:");
                ui.text_edit_singleline(&mut self.settings.csv_filename);
                if ui.button("Select Folder").clicked() {
                    self.select_csv_folder();
                }
            });
            let folder = self.settings.csv_folder.as_deref().unwrap_or("Not selected");
            ui.label(format!("Selected Folder: {folder}"));
            if let Some(path) = self.engine.recorder().path() {
                ui.label(
                    RichText::new(format!("Recording: {}", path.display()))
                        .color(Color32::RED)
                        .small(),
                );
            }
        });
    }

    fn show_channels(&mut self, ui: &mut egui::Ui) {
        let channels: Vec<Channel> = self.engine.registry().channels().cloned().collect();
        if channels.is_empty() {
            return;
        }
        let mut actions = Vec::new();
        ui.label(RichText::new("Channels").strong());
        for channel in &channels {
            let [r, g, b] = channel.color;
            ui.horizontal(|ui| {
                ui.label(RichText::new("■").color(Color32::from_rgb(r, g, b)));
                match &mut self.renaming {
                    Some(draft) if draft.index == channel.index => {
                        let response = ui.text_edit_singleline(&mut draft.text);
                        if !draft.focused {
                            response.request_focus();
                            draft.focused = true;
                        }
                        if response.lost_focus() {
                            actions.push(ChannelAction::Rename(channel.index, draft.text.clone()));
                        }
                    }
                    _ => {
                        let mut visible = channel.visible;
                        let response = ui.checkbox(&mut visible, channel.name.as_str());
                        if response.double_clicked() {
                            actions.push(ChannelAction::StartRename(channel.index));
                        }
                        if response.changed() {
                            actions.push(ChannelAction::SetVisible(channel.index, visible));
                        }
                    }
                }
                if ui.small_button("🗑").on_hover_text("Delete channel").clicked() {
                    actions.push(ChannelAction::Remove(channel.index));
                }
            });
        }
        ui.label(RichText::new("Double-click a name to rename").small().weak());
        self.apply_channel_actions(actions);
    }

    fn show_plot(&self, ui: &mut egui::Ui) {
        let buffer = self.engine.buffer();
        let start = buffer.window_start() as f64;
        let end = buffer.total_count().max(1) as f64;
        Plot::new("serial_plot")
            .legend(Legend::default())
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .include_x(start)
            .include_x(end)
            .auto_bounds_x()
            .auto_bounds_y()
            .show(ui, |plot_ui| {
                for series in self.engine.visible_series() {
                    let [r, g, b] = series.color;
                    let name = if series.name.trim().is_empty() {
                        default_channel_name(series.index)
                    } else {
                        series.name
                    };
                    plot_ui.line(
                        Line::new(PlotPoints::new(series.points))
                            .name(name)
                            .color(Color32::from_rgb(r, g, b))
                            .width(3.0),
                    );
                }
            });
    }
}

impl eframe::App for PlotterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // 1. 采集 (只有 Connected + Running 时才会真的读串口)
        if let Err(err) = self.engine.tick() {
            self.report(err);
        }
        ctx.request_repaint_after(TICK_INTERVAL);

        // 2. UI 绘制
        egui::SidePanel::left("controls").min_width(220.0).show(ctx, |ui| {
            ui.add_space(6.0);
            ui.heading("Serial Plotter");
            ui.separator();
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.show_connection(ui);
                ui.add_space(8.0);
                self.show_csv_settings(ui);
                ui.add_space(8.0);
                self.show_channels(ui);
                ui.add_space(8.0);
                ui.separator();
                if !self.status.is_empty() {
                    let color = if self.status.starts_with("Error") {
                        Color32::RED
                    } else {
                        Color32::GRAY
                    };
                    ui.label(RichText::new(&self.status).color(color));
                }
                if ui.button("Restore Default").clicked() {
                    self.restore_default();
                }
                ui.add_space(6.0);
                egui::ScrollArea::vertical()
                    .id_source("log")
                    .max_height(100.0)
                    .show(ui, |ui| {
                        for m in &self.log_messages {
                            ui.monospace(m);
                        }
                    });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| match self.engine.state() {
                ConnectionState::Disconnected => {
                    ui.label("Connect first.");
                }
                ConnectionState::Connected(run) => {
                    let buffer = self.engine.buffer();
                    let state = if run == RunState::Running { "running" } else { "paused" };
                    if buffer.is_empty() {
                        ui.label(format!(
                            "{} ({state}) · waiting for data",
                            self.engine.port_name()
                        ));
                    } else {
                        ui.label(format!(
                            "{} ({state}) · {} samples · showing {} from {}..{}",
                            self.engine.port_name(),
                            buffer.total_count(),
                            buffer.len(),
                            buffer.window_start(),
                            buffer.total_count()
                        ));
                    }
                }
            });
            self.show_plot(ui);
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.persist();
        self.engine.disconnect();
    }
}

// 端口列表刷新后：保留仍然存在的选择，否则退回到第一个端口
fn pick_port(current: &str, available: &[String]) -> String {
    if available.iter().any(|p| p == current) {
        return current.to_owned();
    }
    available.first().cloned().unwrap_or_else(|| current.to_owned())
}
